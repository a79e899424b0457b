use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::vin::Vin;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuctionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuyBoxId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId(pub String);

static VEHICLE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_vehicle_id() -> VehicleId {
    let id = VEHICLE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    VehicleId(format!("veh-{id:06}"))
}

/// One uploaded row, kept verbatim for audit. Column names are the raw
/// headers exactly as they appeared in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord(pub HashMap<String, String>);

impl RawRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Case-insensitive cell lookup; blank cells read as absent.
    pub fn cell(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(column.trim()))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Canonical vehicle fields a runlist column can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Vin,
    Make,
    Model,
    Year,
    Trim,
    Mileage,
    Color,
    Lane,
    Run,
    StockNumber,
}

impl CanonicalField {
    pub const fn ordered() -> [Self; 10] {
        [
            Self::Vin,
            Self::Make,
            Self::Model,
            Self::Year,
            Self::Trim,
            Self::Mileage,
            Self::Color,
            Self::Lane,
            Self::Run,
            Self::StockNumber,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Vin => "VIN",
            Self::Make => "Make",
            Self::Model => "Model",
            Self::Year => "Year",
            Self::Trim => "Trim",
            Self::Mileage => "Mileage",
            Self::Color => "Color",
            Self::Lane => "Lane",
            Self::Run => "Run",
            Self::StockNumber => "Stock Number",
        }
    }
}

/// Field-to-source-column mapping for one auction's upload format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub auction: AuctionId,
    pub columns: HashMap<CanonicalField, String>,
}

impl ColumnMapping {
    pub fn source_column(&self, field: CanonicalField) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }
}

/// Batch lifecycle for one uploaded runlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStage {
    Uploaded,
    Mapped,
    Enriched,
    Persisted,
    Matched,
    Processed,
    Failed,
}

impl BatchStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Uploaded => "Uploaded",
            Self::Mapped => "Mapped",
            Self::Enriched => "Enriched",
            Self::Persisted => "Persisted",
            Self::Matched => "Matched",
            Self::Processed => "Processed",
            Self::Failed => "Failed",
        }
    }
}

/// Canonical vehicle fields before an id is assigned. Make and model stay
/// `None` until the registry or the alias tables resolve them; there is no
/// "unresolved" sentinel string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleDraft {
    pub vin: Option<Vin>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub trim: Option<String>,
    pub mileage: Option<u32>,
    pub color: Option<String>,
    pub lane: Option<String>,
    pub run: Option<String>,
    pub stock_number: Option<String>,
    pub raw: RawRecord,
}

/// Persisted vehicle row; never mutated by the pipeline after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: VehicleId,
    pub auction: AuctionId,
    pub vin: Option<Vin>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub trim: Option<String>,
    pub mileage: Option<u32>,
    pub color: Option<String>,
    pub lane: Option<String>,
    pub run: Option<String>,
    pub stock_number: Option<String>,
    pub raw: RawRecord,
}

impl VehicleRecord {
    pub(crate) fn from_draft(draft: VehicleDraft, auction: AuctionId) -> Self {
        Self {
            id: next_vehicle_id(),
            auction,
            vin: draft.vin,
            make: draft.make,
            model: draft.model,
            year: draft.year,
            trim: draft.trim,
            mileage: draft.mileage,
            color: draft.color,
            lane: draft.lane,
            run: draft.run,
            stock_number: draft.stock_number,
            raw: draft.raw,
        }
    }
}

/// Upload envelope delivered by the external upload boundary.
#[derive(Debug, Clone)]
pub struct RunlistUpload {
    pub auction: AuctionId,
    pub inspection_date: NaiveDate,
    pub inspector: Option<PartyId>,
    pub bytes: Vec<u8>,
    pub mapping: Option<ColumnMapping>,
    pub allow_heuristic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_lookup_is_case_insensitive_and_skips_blanks() {
        let row = RawRecord::from_pairs([("VIN #", "1HGCM82633A004352"), ("Color", "  ")]);
        assert_eq!(row.cell("vin #"), Some("1HGCM82633A004352"));
        assert_eq!(row.cell("Color"), None);
        assert_eq!(row.cell("Lane"), None);
    }

    #[test]
    fn vehicle_ids_are_unique() {
        let first = next_vehicle_id();
        let second = next_vehicle_id();
        assert_ne!(first, second);
    }
}
