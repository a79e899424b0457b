use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use runlist_core::config::RegistryConfig;
use runlist_core::error::AppError;
use runlist_core::pipeline::{
    AliasStore, AuctionId, BuyBox, CriteriaStore, HttpRegistryClient, IngestService, MakeAlias,
    ModelAlias, ReferenceSnapshot, ReferenceStore, RepositoryError, SystemClock, VehicleRecord,
    VehicleRegistry, VehicleRepository, WorkItem, WorkItemError, WorkItemSink,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

/// The concrete service wiring this binary runs: the public registry behind
/// an HTTP client, everything else in process memory.
pub(crate) type ApiIngestService = IngestService<
    HttpRegistryClient,
    InMemoryReferenceStore,
    SystemClock,
    InMemoryVehicleRepository,
    InMemoryAliasStore,
    InMemoryCriteriaStore,
    InMemoryWorkItemSink,
>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryVehicleRepository {
    records: Mutex<Vec<VehicleRecord>>,
}

impl VehicleRepository for InMemoryVehicleRepository {
    fn insert_many(
        &self,
        vehicles: Vec<VehicleRecord>,
    ) -> Result<Vec<VehicleRecord>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.extend(vehicles.iter().cloned());
        Ok(vehicles)
    }

    fn for_auction(&self, auction: &AuctionId) -> Result<Vec<VehicleRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| &record.auction == auction)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryAliasStore {
    makes: Mutex<Vec<MakeAlias>>,
    models: Mutex<Vec<ModelAlias>>,
}

impl InMemoryAliasStore {
    pub(crate) fn with_aliases(makes: Vec<MakeAlias>, models: Vec<ModelAlias>) -> Self {
        Self {
            makes: Mutex::new(makes),
            models: Mutex::new(models),
        }
    }
}

impl AliasStore for InMemoryAliasStore {
    // Lookup is for the exact stored alias string; casing variants are
    // separate alias rows, managed by the administrator.
    fn canonical_make(
        &self,
        alias: &str,
        scope: Option<&AuctionId>,
    ) -> Result<Option<String>, RepositoryError> {
        let guard = self.makes.lock().expect("alias mutex poisoned");
        Ok(guard
            .iter()
            .find(|row| row.alias == alias && row.scope.as_ref() == scope)
            .map(|row| row.canonical.clone()))
    }

    fn canonical_model(
        &self,
        make: &str,
        alias: &str,
        scope: Option<&AuctionId>,
    ) -> Result<Option<String>, RepositoryError> {
        let guard = self.models.lock().expect("alias mutex poisoned");
        Ok(guard
            .iter()
            .find(|row| {
                row.make == make && row.alias == alias && row.scope.as_ref() == scope
            })
            .map(|row| row.canonical.clone()))
    }
}

#[derive(Default)]
pub(crate) struct InMemoryCriteriaStore {
    boxes: Mutex<Vec<BuyBox>>,
}

impl InMemoryCriteriaStore {
    pub(crate) fn with_boxes(boxes: Vec<BuyBox>) -> Self {
        Self {
            boxes: Mutex::new(boxes),
        }
    }
}

impl CriteriaStore for InMemoryCriteriaStore {
    fn active(&self) -> Result<Vec<BuyBox>, RepositoryError> {
        let guard = self.boxes.lock().expect("criteria mutex poisoned");
        Ok(guard.iter().filter(|bb| bb.active).cloned().collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryReferenceStore {
    makes: Mutex<Option<ReferenceSnapshot>>,
    models: Mutex<HashMap<String, ReferenceSnapshot>>,
}

impl ReferenceStore for InMemoryReferenceStore {
    fn makes(&self) -> Result<Option<ReferenceSnapshot>, RepositoryError> {
        let guard = self.makes.lock().expect("reference mutex poisoned");
        Ok(guard.clone())
    }

    fn save_makes(&self, snapshot: ReferenceSnapshot) -> Result<(), RepositoryError> {
        let mut guard = self.makes.lock().expect("reference mutex poisoned");
        *guard = Some(snapshot);
        Ok(())
    }

    fn models_for(&self, make: &str) -> Result<Option<ReferenceSnapshot>, RepositoryError> {
        let guard = self.models.lock().expect("reference mutex poisoned");
        Ok(guard.get(&make.to_ascii_lowercase()).cloned())
    }

    fn save_models(&self, make: &str, snapshot: ReferenceSnapshot) -> Result<(), RepositoryError> {
        let mut guard = self.models.lock().expect("reference mutex poisoned");
        guard.insert(make.to_ascii_lowercase(), snapshot);
        Ok(())
    }
}

/// Records work items and logs each one; stands in for the downstream
/// inspection task service.
#[derive(Default)]
pub(crate) struct InMemoryWorkItemSink {
    items: Mutex<Vec<WorkItem>>,
}

impl InMemoryWorkItemSink {
    #[cfg(test)]
    pub(crate) fn items(&self) -> Vec<WorkItem> {
        self.items.lock().expect("work item mutex poisoned").clone()
    }
}

impl WorkItemSink for InMemoryWorkItemSink {
    fn submit(&self, item: WorkItem) -> Result<(), WorkItemError> {
        info!(
            vehicle = %item.vehicle.0,
            buy_box = %item.buy_box.0,
            owner = %item.owner.0,
            "inspection work item queued"
        );
        let mut guard = self.items.lock().expect("work item mutex poisoned");
        guard.push(item);
        Ok(())
    }
}

/// Wire the ingestion service against the public registry plus in-process
/// stores. Alias tables and criteria are whatever the caller seeds.
pub(crate) fn build_service(
    registry: &RegistryConfig,
    aliases: InMemoryAliasStore,
    criteria: InMemoryCriteriaStore,
) -> Result<ApiIngestService, AppError> {
    let gateway = HttpRegistryClient::new(&registry.base_url, registry.timeout_secs)?;
    let decode_registry = VehicleRegistry::new(
        gateway,
        InMemoryReferenceStore::default(),
        registry.decode_cache_capacity,
        registry.reference_freshness_hours,
    );

    Ok(IngestService::new(
        Arc::new(decode_registry),
        Arc::new(InMemoryVehicleRepository::default()),
        Arc::new(aliases),
        Arc::new(criteria),
        Arc::new(InMemoryWorkItemSink::default()),
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_lookup_matches_the_exact_stored_string() {
        let store = InMemoryAliasStore::with_aliases(
            vec![MakeAlias {
                alias: "Chevy".to_string(),
                canonical: "Chevrolet".to_string(),
                scope: None,
            }],
            Vec::new(),
        );

        assert_eq!(
            store.canonical_make("Chevy", None).expect("lookup runs"),
            Some("Chevrolet".to_string())
        );
        assert_eq!(store.canonical_make("CHEVY", None).expect("lookup runs"), None);
        assert_eq!(store.canonical_make("chevy", None).expect("lookup runs"), None);
    }
}
