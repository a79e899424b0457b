use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use super::alias::AliasResolver;
use super::domain::{
    AuctionId, BatchStage, CanonicalField, ColumnMapping, RawRecord, RunlistUpload, VehicleId,
    VehicleRecord,
};
use super::mapper;
use super::matching;
use super::parser::{self, ParseError};
use super::registry::{Clock, RegistryGateway, VehicleRegistry};
use super::repository::{
    AliasStore, CriteriaStore, ReferenceStore, RepositoryError, VehicleRepository, WorkItem,
    WorkItemSink,
};

/// Batch-fatal ingestion failure. Row-level problems never surface here;
/// they are logged, counted, and reported in the summary.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("runlist file rejected: {0}")]
    Validation(#[from] ParseError),
    #[error("could not persist batch: {0}")]
    Persistence(RepositoryError),
    #[error("could not read back persisted batch: {0}")]
    Readback(RepositoryError),
    #[error("could not load acquisition criteria: {0}")]
    Criteria(RepositoryError),
}

impl IngestError {
    /// Last stage the batch successfully reached before failing.
    pub fn stage_reached(&self) -> BatchStage {
        match self {
            IngestError::Validation(_) => BatchStage::Uploaded,
            IngestError::Persistence(_) => BatchStage::Enriched,
            IngestError::Readback(_) | IngestError::Criteria(_) => BatchStage::Persisted,
        }
    }
}

/// Outcome of one batch run. A missing column mapping is a normal outcome
/// requiring caller action, not an error.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    MappingRequired {
        sample_row: Option<RawRecord>,
        suggested_mapping: ColumnMapping,
        /// Canonical fields the suggestion could not place, in display
        /// order, so the caller knows what is left to map by hand.
        unmapped_fields: Vec<&'static str>,
    },
    Completed {
        summary: IngestSummary,
    },
}

/// Per-batch accounting returned to the caller; never a silent partial
/// result.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub auction: AuctionId,
    pub inspection_date: NaiveDate,
    pub stage: BatchStage,
    pub rows_parsed: usize,
    pub rows_skipped: usize,
    pub vehicles_created: usize,
    pub enrichment_failures: usize,
    pub vehicles_matched: usize,
    pub matches_found: usize,
    pub work_items_created: usize,
    pub work_item_failures: usize,
}

/// Sequences parse, mapping, enrichment, persistence, matching, and work
/// item production for one uploaded runlist. One batch runs end-to-end
/// synchronously; there is no cancellation once it starts.
pub struct IngestService<G, RS, C, V, A, B, W>
where
    G: RegistryGateway,
    RS: ReferenceStore,
    C: Clock,
    V: VehicleRepository,
    A: AliasStore,
    B: CriteriaStore,
    W: WorkItemSink,
{
    registry: Arc<VehicleRegistry<G, RS, C>>,
    vehicles: Arc<V>,
    aliases: Arc<A>,
    criteria: Arc<B>,
    work_items: Arc<W>,
}

impl<G, RS, C, V, A, B, W> IngestService<G, RS, C, V, A, B, W>
where
    G: RegistryGateway,
    RS: ReferenceStore,
    C: Clock,
    V: VehicleRepository,
    A: AliasStore,
    B: CriteriaStore,
    W: WorkItemSink,
{
    pub fn new(
        registry: Arc<VehicleRegistry<G, RS, C>>,
        vehicles: Arc<V>,
        aliases: Arc<A>,
        criteria: Arc<B>,
        work_items: Arc<W>,
    ) -> Self {
        Self {
            registry,
            vehicles,
            aliases,
            criteria,
            work_items,
        }
    }

    pub fn ingest(&self, upload: RunlistUpload) -> Result<IngestOutcome, IngestError> {
        let RunlistUpload {
            auction,
            inspection_date,
            inspector,
            bytes,
            mapping,
            allow_heuristic,
        } = upload;

        info!(
            auction = %auction.0,
            %inspection_date,
            inspector = inspector.as_ref().map(|p| p.0.as_str()),
            "runlist upload received"
        );

        let rows = parser::parse_rows(&bytes)?;
        let rows_parsed = rows.len();

        if mapping.is_none() && !allow_heuristic {
            let suggested_mapping = match rows.first() {
                Some(sample) => mapper::suggest_mapping(&auction, sample),
                None => ColumnMapping {
                    auction: auction.clone(),
                    columns: Default::default(),
                },
            };
            let unmapped_fields = CanonicalField::ordered()
                .into_iter()
                .filter(|field| suggested_mapping.source_column(*field).is_none())
                .map(CanonicalField::label)
                .collect();
            info!(auction = %auction.0, "no column mapping for upload, caller action required");
            return Ok(IngestOutcome::MappingRequired {
                sample_row: rows.first().cloned(),
                suggested_mapping,
                unmapped_fields,
            });
        }

        // UPLOADED -> MAPPED
        let mut drafts = Vec::with_capacity(rows.len());
        let mut rows_skipped = 0usize;
        for (index, row) in rows.iter().enumerate() {
            let mapped = match &mapping {
                Some(mapping) => mapper::map_explicit(row, mapping),
                None => mapper::map_heuristic(row),
            };
            match mapped {
                Ok(draft) => drafts.push(draft),
                Err(error) => {
                    warn!(row = index + 1, %error, "skipping unmappable row");
                    rows_skipped += 1;
                }
            }
        }

        // MAPPED -> ENRICHED
        // Sequential on purpose: the registry has no bulk endpoint and
        // uncontrolled fan-out risks its rate limits.
        let resolver = AliasResolver::new(self.aliases.as_ref());
        let mut enrichment_failures = 0usize;
        for draft in &mut drafts {
            if let Some(vin) = draft.vin.clone() {
                match self.registry.decode(vin.as_str()) {
                    Ok(decoded) => {
                        if draft.make.is_none() {
                            draft.make = decoded.make().map(str::to_string);
                        }
                        if draft.model.is_none() {
                            draft.model = decoded.model().map(str::to_string);
                        }
                        if draft.year.is_none() {
                            draft.year = decoded.model_year();
                        }
                        if draft.trim.is_none() {
                            draft.trim = decoded.trim_level().map(str::to_string);
                        }
                    }
                    Err(error) => {
                        warn!(vin = %vin, %error, "enrichment failed, continuing unresolved");
                        enrichment_failures += 1;
                    }
                }
            }

            self.normalize_draft_names(&resolver, draft, &auction);
        }

        // ENRICHED -> PERSISTED: one bulk insert for the whole batch.
        let records: Vec<VehicleRecord> = drafts
            .into_iter()
            .map(|draft| VehicleRecord::from_draft(draft, auction.clone()))
            .collect();
        let vehicles_created = records.len();
        let batch_ids: HashSet<VehicleId> = records.iter().map(|record| record.id.clone()).collect();
        self.vehicles
            .insert_many(records)
            .map_err(IngestError::Persistence)?;

        // PERSISTED -> MATCHED: re-read the persisted set and evaluate the
        // criteria active right now. Later criteria edits do not re-trigger.
        let persisted = self
            .vehicles
            .for_auction(&auction)
            .map_err(IngestError::Readback)?;
        let criteria = self.criteria.active().map_err(IngestError::Criteria)?;

        let mut vehicles_matched = 0usize;
        let mut matches_found = 0usize;
        let mut work_items_created = 0usize;
        let mut work_item_failures = 0usize;

        for vehicle in persisted
            .iter()
            .filter(|vehicle| batch_ids.contains(&vehicle.id))
        {
            let result = matching::match_vehicle(vehicle, &criteria);
            if result.satisfied.is_empty() {
                continue;
            }
            vehicles_matched += 1;

            for buy_box in result.satisfied {
                matches_found += 1;
                let item = WorkItem {
                    vehicle: vehicle.id.clone(),
                    buy_box: buy_box.id.clone(),
                    owner: buy_box.owner.clone(),
                };
                match self.work_items.submit(item) {
                    Ok(()) => work_items_created += 1,
                    Err(error) => {
                        // Per-item, logged, not retried.
                        warn!(
                            vehicle = %vehicle.id.0,
                            buy_box = %buy_box.id.0,
                            %error,
                            "work item submission failed"
                        );
                        work_item_failures += 1;
                    }
                }
            }
        }

        let summary = IngestSummary {
            auction,
            inspection_date,
            stage: BatchStage::Processed,
            rows_parsed,
            rows_skipped,
            vehicles_created,
            enrichment_failures,
            vehicles_matched,
            matches_found,
            work_items_created,
            work_item_failures,
        };
        info!(
            auction = %summary.auction.0,
            vehicles_created = summary.vehicles_created,
            matches_found = summary.matches_found,
            "runlist processed"
        );

        Ok(IngestOutcome::Completed { summary })
    }

    fn normalize_draft_names(
        &self,
        resolver: &AliasResolver<'_, A>,
        draft: &mut super::domain::VehicleDraft,
        auction: &AuctionId,
    ) {
        match (draft.make.clone(), draft.model.clone()) {
            (Some(make), Some(model)) => {
                match resolver.normalize_model(&make, &model, Some(auction)) {
                    Ok((canonical_make, canonical_model)) => {
                        draft.make = Some(canonical_make);
                        draft.model = Some(canonical_model);
                    }
                    Err(error) => {
                        warn!(%error, "alias lookup failed, keeping raw make/model");
                    }
                }
            }
            (Some(make), None) => match resolver.normalize_make(&make, Some(auction)) {
                Ok(canonical_make) => draft.make = Some(canonical_make),
                Err(error) => {
                    warn!(%error, "alias lookup failed, keeping raw make");
                }
            },
            _ => {}
        }
    }
}
