use serde::{Deserialize, Serialize};

use super::domain::{BuyBoxId, PartyId, VehicleId, VehicleRecord};

/// One party's acquisition criteria. Bounds are independently optional; an
/// absent bound leaves that side of the range open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyBox {
    pub id: BuyBoxId,
    pub owner: PartyId,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub trim: Option<String>,
    #[serde(default)]
    pub year_min: Option<i32>,
    #[serde(default)]
    pub year_max: Option<i32>,
    #[serde(default)]
    pub mileage_min: Option<u32>,
    #[serde(default)]
    pub mileage_max: Option<u32>,
    #[serde(default)]
    pub price_min: Option<u32>,
    #[serde(default)]
    pub price_max: Option<u32>,
    pub active: bool,
}

/// A vehicle and the criteria it satisfied, computed once per batch and
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult<'a> {
    pub vehicle: VehicleId,
    pub satisfied: Vec<&'a BuyBox>,
}

/// All active-criteria predicates must hold. A missing vehicle year or
/// mileage skips that predicate rather than rejecting the vehicle. Price
/// bounds are not evaluated here because no asking price exists on a
/// runlist row.
pub fn matches(vehicle: &VehicleRecord, buy_box: &BuyBox) -> bool {
    if !buy_box.active {
        return false;
    }

    match vehicle.make.as_deref() {
        Some(make) if make == buy_box.make => {}
        _ => return false,
    }
    match vehicle.model.as_deref() {
        Some(model) if model == buy_box.model => {}
        _ => return false,
    }

    if !within(vehicle.year, buy_box.year_min, buy_box.year_max) {
        return false;
    }
    if !within(vehicle.mileage, buy_box.mileage_min, buy_box.mileage_max) {
        return false;
    }

    if let Some(wanted_trim) = buy_box.trim.as_deref() {
        match vehicle.trim.as_deref() {
            Some(trim) if trim.eq_ignore_ascii_case(wanted_trim) => {}
            _ => return false,
        }
    }

    true
}

pub fn match_vehicle<'a>(vehicle: &VehicleRecord, criteria: &'a [BuyBox]) -> MatchResult<'a> {
    MatchResult {
        vehicle: vehicle.id.clone(),
        satisfied: criteria
            .iter()
            .filter(|buy_box| matches(vehicle, buy_box))
            .collect(),
    }
}

fn within<T: PartialOrd>(value: Option<T>, min: Option<T>, max: Option<T>) -> bool {
    let Some(value) = value else {
        // Absent vehicle data skips the predicate entirely.
        return true;
    };

    if let Some(min) = min {
        if value < min {
            return false;
        }
    }
    if let Some(max) = max {
        if value > max {
            return false;
        }
    }

    true
}
