use crate::infra::{deserialize_date, ApiIngestService, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::NaiveDate;
use runlist_core::error::AppError;
use runlist_core::pipeline::{
    AuctionId, CanonicalField, ColumnMapping, IngestOutcome, PartyId, RunlistUpload,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct RunlistUploadRequest {
    pub(crate) auction: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) inspection_date: NaiveDate,
    #[serde(default)]
    pub(crate) inspector: Option<String>,
    /// Runlist file content, passed through verbatim.
    pub(crate) csv: String,
    #[serde(default)]
    pub(crate) mapping: Option<HashMap<CanonicalField, String>>,
    #[serde(default)]
    pub(crate) allow_heuristic: bool,
}

impl RunlistUploadRequest {
    fn into_upload(self) -> RunlistUpload {
        let auction = AuctionId(self.auction);
        let mapping = self.mapping.map(|columns| ColumnMapping {
            auction: auction.clone(),
            columns,
        });

        RunlistUpload {
            auction,
            inspection_date: self.inspection_date,
            inspector: self.inspector.map(PartyId),
            bytes: self.csv.into_bytes(),
            mapping,
            allow_heuristic: self.allow_heuristic,
        }
    }
}

pub(crate) fn with_ingest_routes(service: Arc<ApiIngestService>) -> axum::Router {
    axum::Router::new()
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/runlists", axum::routing::post(ingest_endpoint))
        .layer(Extension(service))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn ingest_endpoint(
    Extension(service): Extension<Arc<ApiIngestService>>,
    Json(payload): Json<RunlistUploadRequest>,
) -> Result<Json<IngestOutcome>, AppError> {
    run_ingest(service, payload.into_upload()).await.map(Json)
}

/// The registry client drives its own blocking runtime, so a batch must run
/// off the async workers.
pub(crate) async fn run_ingest(
    service: Arc<ApiIngestService>,
    upload: RunlistUpload,
) -> Result<IngestOutcome, AppError> {
    let outcome = tokio::task::spawn_blocking(move || service.ingest(upload))
        .await
        .map_err(|err| AppError::Server(axum::Error::new(err)))??;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{build_service, InMemoryAliasStore, InMemoryCriteriaStore};
    use runlist_core::config::RegistryConfig;
    use runlist_core::pipeline::{IngestError, ParseError};

    fn offline_service() -> Arc<ApiIngestService> {
        let registry = RegistryConfig {
            // Unroutable on purpose; these tests never reach the decode step.
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            decode_cache_capacity: 10,
            reference_freshness_hours: 24,
        };
        let service = build_service(
            &registry,
            InMemoryAliasStore::default(),
            InMemoryCriteriaStore::default(),
        )
        .expect("service builds");
        Arc::new(service)
    }

    fn request(csv: &str) -> RunlistUploadRequest {
        RunlistUploadRequest {
            auction: "auction-7".to_string(),
            inspection_date: NaiveDate::from_ymd_opt(2025, 6, 12).expect("valid date"),
            inspector: None,
            csv: csv.to_string(),
            mapping: None,
            allow_heuristic: false,
        }
    }

    #[tokio::test]
    async fn upload_without_mapping_asks_for_one() {
        let service = offline_service();
        let payload = request("VIN #,Lane\n1HGCM82633A004352,4\n");

        let Json(outcome) = ingest_endpoint(Extension(service), Json(payload))
            .await
            .expect("mapping required is a normal outcome");

        match outcome {
            IngestOutcome::MappingRequired {
                sample_row,
                suggested_mapping,
                unmapped_fields,
            } => {
                assert!(sample_row.is_some());
                assert_eq!(
                    suggested_mapping.source_column(CanonicalField::Vin),
                    Some("VIN #")
                );
                assert!(unmapped_fields.contains(&"Make"));
            }
            other => panic!("expected mapping required, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn binary_upload_is_rejected() {
        let service = offline_service();
        let payload = request("VIN\n\u{0}\u{0}\u{0}\u{0}\n");

        let error = ingest_endpoint(Extension(service), Json(payload))
            .await
            .expect_err("binary content rejected");

        assert!(matches!(
            error,
            AppError::Ingest(IngestError::Validation(ParseError::BinaryContent))
        ));
    }
}
