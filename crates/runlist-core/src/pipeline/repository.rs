use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AuctionId, BuyBoxId, PartyId, VehicleId, VehicleRecord};
use super::matching::BuyBox;

/// Administrator-managed make alias row. `scope` of `None` is the general
/// tier that any auction falls back to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeAlias {
    pub alias: String,
    pub canonical: String,
    pub scope: Option<AuctionId>,
}

/// Administrator-managed model alias row, keyed under a canonical make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAlias {
    pub make: String,
    pub alias: String,
    pub canonical: String,
    pub scope: Option<AuctionId>,
}

/// Error enumeration for persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Alias lookup seam; the pipeline only ever reads alias rows.
pub trait AliasStore: Send + Sync {
    /// Canonical make for `alias` in exactly one tier; `None` scope queries
    /// the general tier.
    fn canonical_make(
        &self,
        alias: &str,
        scope: Option<&AuctionId>,
    ) -> Result<Option<String>, RepositoryError>;

    /// Canonical model for `(make, alias)` in exactly one tier.
    fn canonical_model(
        &self,
        make: &str,
        alias: &str,
        scope: Option<&AuctionId>,
    ) -> Result<Option<String>, RepositoryError>;
}

/// Vehicle persistence seam: one bulk insert per batch, reads by auction.
pub trait VehicleRepository: Send + Sync {
    fn insert_many(
        &self,
        vehicles: Vec<VehicleRecord>,
    ) -> Result<Vec<VehicleRecord>, RepositoryError>;

    fn for_auction(&self, auction: &AuctionId) -> Result<Vec<VehicleRecord>, RepositoryError>;
}

/// Read access to the acquisition criteria active at match time.
pub trait CriteriaStore: Send + Sync {
    fn active(&self) -> Result<Vec<BuyBox>, RepositoryError>;
}

/// Cached bulk reference data (make list, model list) with its refresh stamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub names: Vec<String>,
    pub refreshed_at: DateTime<Utc>,
}

/// Persistent backing for the registry's read-through reference cache.
pub trait ReferenceStore: Send + Sync {
    fn makes(&self) -> Result<Option<ReferenceSnapshot>, RepositoryError>;
    fn save_makes(&self, snapshot: ReferenceSnapshot) -> Result<(), RepositoryError>;
    fn models_for(&self, make: &str) -> Result<Option<ReferenceSnapshot>, RepositoryError>;
    fn save_models(&self, make: &str, snapshot: ReferenceSnapshot)
        -> Result<(), RepositoryError>;
}

/// Downstream hand-off payload: one per satisfied (vehicle, buy box) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub vehicle: VehicleId,
    pub buy_box: BuyBoxId,
    pub owner: PartyId,
}

/// Work item dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum WorkItemError {
    #[error("work item transport unavailable: {0}")]
    Transport(String),
}

/// Trait describing the external task-creation collaborator.
pub trait WorkItemSink: Send + Sync {
    fn submit(&self, item: WorkItem) -> Result<(), WorkItemError>;
}
