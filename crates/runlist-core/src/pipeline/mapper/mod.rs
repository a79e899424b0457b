mod headers;

use tracing::warn;

use super::domain::{AuctionId, CanonicalField, ColumnMapping, RawRecord, VehicleDraft};
use super::vin::{Vin, VinError};

pub(crate) use headers::guess_column;

/// Row-level mapping failure. The orchestrator logs and skips the row; it
/// never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("row has no identifier value")]
    MissingIdentifier,
    #[error("row identifier is malformed: {0}")]
    InvalidIdentifier(#[from] VinError),
}

/// Map a raw row through an explicit field-to-column mapping. Unmapped or
/// blank optional fields become `None`; a missing or malformed VIN fails the
/// row because nothing downstream can anchor it.
pub fn map_explicit(row: &RawRecord, mapping: &ColumnMapping) -> Result<VehicleDraft, RowError> {
    let vin_cell = mapping
        .source_column(CanonicalField::Vin)
        .and_then(|column| row.cell(column))
        .ok_or(RowError::MissingIdentifier)?;
    let vin = Vin::parse(vin_cell)?;

    let text = |field: CanonicalField| -> Option<String> {
        mapping
            .source_column(field)
            .and_then(|column| row.cell(column))
            .map(str::to_string)
    };

    Ok(VehicleDraft {
        vin: Some(vin),
        make: text(CanonicalField::Make),
        model: text(CanonicalField::Model),
        year: parse_year(row, text(CanonicalField::Year)),
        trim: text(CanonicalField::Trim),
        mileage: parse_mileage(row, text(CanonicalField::Mileage)),
        color: text(CanonicalField::Color),
        lane: text(CanonicalField::Lane),
        run: text(CanonicalField::Run),
        stock_number: text(CanonicalField::StockNumber),
        raw: row.clone(),
    })
}

/// Map a raw row with no configured mapping. Only VIN, lane, and run are
/// guessed from the header-synonym table; make and model stay absent until
/// enrichment resolves them.
pub fn map_heuristic(row: &RawRecord) -> Result<VehicleDraft, RowError> {
    let columns: Vec<&str> = row.columns().collect();

    let guess = |field: CanonicalField| -> Option<String> {
        guess_column(field, &columns)
            .and_then(|column| row.cell(column))
            .map(str::to_string)
    };

    let vin_cell = guess(CanonicalField::Vin).ok_or(RowError::MissingIdentifier)?;
    let vin = Vin::parse(&vin_cell)?;

    Ok(VehicleDraft {
        vin: Some(vin),
        lane: guess(CanonicalField::Lane),
        run: guess(CanonicalField::Run),
        raw: row.clone(),
        ..VehicleDraft::default()
    })
}

/// Heuristic guesses for a sample row, offered back to the caller alongside a
/// mapping-required outcome so it can confirm or correct them.
pub fn suggest_mapping(auction: &AuctionId, sample: &RawRecord) -> ColumnMapping {
    let columns: Vec<&str> = sample.columns().collect();
    let guessed = headers::guessable_fields()
        .filter_map(|field| {
            guess_column(field, &columns).map(|column| (field, column.to_string()))
        })
        .collect();

    ColumnMapping {
        auction: auction.clone(),
        columns: guessed,
    }
}

fn parse_year(row: &RawRecord, value: Option<String>) -> Option<i32> {
    let raw = value?;
    match raw.replace(',', "").trim().parse::<i32>() {
        Ok(year) => Some(year),
        Err(_) => {
            warn!(value = %raw, row = ?row.0.get("VIN"), "unparseable year, storing none");
            None
        }
    }
}

fn parse_mileage(row: &RawRecord, value: Option<String>) -> Option<u32> {
    let raw = value?;
    match raw.replace(',', "").trim().parse::<u32>() {
        Ok(mileage) => Some(mileage),
        Err(_) => {
            warn!(value = %raw, row = ?row.0.get("VIN"), "unparseable mileage, storing none");
            None
        }
    }
}
