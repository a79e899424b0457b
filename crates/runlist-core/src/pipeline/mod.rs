//! Runlist ingestion pipeline: column mapping, registry enrichment, alias
//! normalization, buy-box matching, and the orchestrating batch state
//! machine.

pub mod alias;
pub mod domain;
pub mod ingest;
pub mod mapper;
pub mod matching;
pub mod parser;
pub mod registry;
pub mod repository;
pub mod vin;

pub use alias::AliasResolver;
pub use domain::{
    AuctionId, BatchStage, BuyBoxId, CanonicalField, ColumnMapping, PartyId, RawRecord,
    RunlistUpload, VehicleDraft, VehicleId, VehicleRecord,
};
pub use ingest::{IngestError, IngestOutcome, IngestService, IngestSummary};
pub use matching::{match_vehicle, matches, BuyBox, MatchResult};
pub use parser::ParseError;
pub use registry::{
    Clock, DecodedVehicle, HttpRegistryClient, RegistryError, RegistryGateway, SystemClock,
    VehicleRegistry,
};
pub use repository::{
    AliasStore, CriteriaStore, MakeAlias, ModelAlias, ReferenceSnapshot, ReferenceStore,
    RepositoryError, VehicleRepository, WorkItem, WorkItemError, WorkItemSink,
};
pub use vin::{Vin, VinError};
