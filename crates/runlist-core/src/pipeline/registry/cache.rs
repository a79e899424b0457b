use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use super::DecodedVehicle;

/// Injectable time source so cache behavior is testable without waiting.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Self-limiting VIN decode cache. Entries have no individual expiry; a
/// sweep runs at most once per hour and clears the whole map when the entry
/// count is over capacity. Coarse on purpose; this is not an LRU.
#[derive(Debug)]
pub(crate) struct DecodeCache {
    entries: HashMap<String, DecodedVehicle>,
    capacity: usize,
    last_sweep: DateTime<Utc>,
}

impl DecodeCache {
    pub(crate) fn new(capacity: usize, now: DateTime<Utc>) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
            last_sweep: now,
        }
    }

    pub(crate) fn get(&self, vin: &str) -> Option<&DecodedVehicle> {
        self.entries.get(vin)
    }

    pub(crate) fn insert(&mut self, vin: String, decoded: DecodedVehicle) {
        self.entries.insert(vin, decoded);
    }

    pub(crate) fn housekeeping(&mut self, now: DateTime<Utc>) {
        if now - self.last_sweep < Duration::hours(1) {
            return;
        }
        self.last_sweep = now;
        if self.entries.len() > self.capacity {
            self.entries.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn decoded() -> DecodedVehicle {
        DecodedVehicle::from_attributes([("Make", "HONDA")])
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn sweep_is_a_no_op_within_the_hour() {
        let mut cache = DecodeCache::new(1, start());
        cache.insert("A".to_string(), decoded());
        cache.insert("B".to_string(), decoded());

        cache.housekeeping(start() + Duration::minutes(59));
        assert_eq!(cache.len(), 2, "over capacity but inside the sweep window");
    }

    #[test]
    fn sweep_clears_everything_when_over_capacity() {
        let mut cache = DecodeCache::new(1, start());
        cache.insert("A".to_string(), decoded());
        cache.insert("B".to_string(), decoded());

        cache.housekeeping(start() + Duration::hours(1));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn sweep_preserves_entries_under_capacity() {
        let mut cache = DecodeCache::new(10, start());
        cache.insert("A".to_string(), decoded());

        cache.housekeeping(start() + Duration::hours(2));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("A").is_some());
    }

    #[test]
    fn sweeps_do_not_rerun_until_another_hour_passes() {
        let mut cache = DecodeCache::new(1, start());
        cache.housekeeping(start() + Duration::hours(1));

        cache.insert("A".to_string(), decoded());
        cache.insert("B".to_string(), decoded());
        cache.housekeeping(start() + Duration::hours(1) + Duration::minutes(30));
        assert_eq!(cache.len(), 2, "second sweep is due an hour after the first");
    }
}
