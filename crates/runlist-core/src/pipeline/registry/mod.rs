mod cache;
mod http;

pub use cache::{Clock, SystemClock};
pub use http::HttpRegistryClient;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

use super::repository::{ReferenceSnapshot, ReferenceStore, RepositoryError};
use super::vin::{Vin, VinError};
use cache::DecodeCache;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid vehicle identifier: {0}")]
    InvalidVin(#[from] VinError),
    #[error("registry request failed: {0}")]
    Transport(String),
    #[error("registry response malformed: {0}")]
    Malformed(String),
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// Flat attribute set the registry decodes a VIN into. Only attributes the
/// registry actually returned are present; an absent key is genuinely
/// unknown, never a sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedVehicle {
    pub attributes: HashMap<String, String>,
}

impl DecodedVehicle {
    pub fn from_attributes<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            attributes: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn make(&self) -> Option<&str> {
        self.attribute("Make")
    }

    pub fn model(&self) -> Option<&str> {
        self.attribute("Model")
    }

    pub fn model_year(&self) -> Option<i32> {
        self.attribute("ModelYear")?.trim().parse().ok()
    }

    pub fn trim_level(&self) -> Option<&str> {
        self.attribute("Trim")
    }
}

/// Transport seam for the external registry; synchronous signatures so the
/// pipeline stays a plain sequential loop.
pub trait RegistryGateway: Send + Sync {
    fn decode_vin(&self, vin: &Vin) -> Result<DecodedVehicle, RegistryError>;
    fn all_makes(&self) -> Result<Vec<String>, RegistryError>;
    fn models_for_make(&self, make: &str) -> Result<Vec<String>, RegistryError>;
}

/// Registry client composing the gateway with the decode cache and the
/// persistent read-through reference layer. The cache lives on the instance,
/// behind a mutex, with an injectable clock; there is no ambient global.
pub struct VehicleRegistry<G, S, C = SystemClock>
where
    G: RegistryGateway,
    S: ReferenceStore,
    C: Clock,
{
    gateway: G,
    store: S,
    clock: C,
    decode_cache: Mutex<DecodeCache>,
    reference_freshness: Duration,
}

impl<G, S> VehicleRegistry<G, S, SystemClock>
where
    G: RegistryGateway,
    S: ReferenceStore,
{
    pub fn new(gateway: G, store: S, cache_capacity: usize, freshness_hours: u64) -> Self {
        Self::with_clock(gateway, store, cache_capacity, freshness_hours, SystemClock)
    }
}

impl<G, S, C> VehicleRegistry<G, S, C>
where
    G: RegistryGateway,
    S: ReferenceStore,
    C: Clock,
{
    pub fn with_clock(
        gateway: G,
        store: S,
        cache_capacity: usize,
        freshness_hours: u64,
        clock: C,
    ) -> Self {
        let now = clock.now();
        Self {
            gateway,
            store,
            clock,
            decode_cache: Mutex::new(DecodeCache::new(cache_capacity, now)),
            reference_freshness: Duration::hours(freshness_hours as i64),
        }
    }

    /// Decode an identifier into registry attributes. Format validation runs
    /// first and short-circuits locally; no malformed identifier ever
    /// reaches the network.
    pub fn decode(&self, raw: &str) -> Result<DecodedVehicle, RegistryError> {
        let vin = Vin::parse(raw)?;

        {
            let mut cache = self.decode_cache.lock().expect("decode cache mutex poisoned");
            cache.housekeeping(self.clock.now());
            if let Some(hit) = cache.get(vin.as_str()) {
                return Ok(hit.clone());
            }
        }

        let decoded = self.gateway.decode_vin(&vin)?;

        let mut cache = self.decode_cache.lock().expect("decode cache mutex poisoned");
        cache.insert(vin.as_str().to_string(), decoded.clone());
        Ok(decoded)
    }

    /// Full make list, served from storage while fresh (24h by default).
    /// A stale snapshot triggers a registry fetch whose case-insensitively
    /// new names are merged in before the freshness stamp is advanced.
    pub fn makes(&self) -> Result<Vec<String>, RegistryError> {
        let snapshot = self.store.makes()?;
        if let Some(snapshot) = &snapshot {
            if self.clock.now() - snapshot.refreshed_at < self.reference_freshness {
                return Ok(snapshot.names.clone());
            }
        }

        match self.gateway.all_makes() {
            Ok(fetched) => {
                let existing = snapshot.map(|s| s.names).unwrap_or_default();
                let merged = merge_new_names(existing, fetched);
                self.store.save_makes(ReferenceSnapshot {
                    names: merged.clone(),
                    refreshed_at: self.clock.now(),
                })?;
                Ok(merged)
            }
            Err(error) => match snapshot {
                Some(stale) => {
                    warn!(%error, "registry make list unavailable, serving stale snapshot");
                    Ok(stale.names)
                }
                None => Err(error),
            },
        }
    }

    /// Model list for one make, with the same read-through policy as makes.
    pub fn models_for(&self, make: &str) -> Result<Vec<String>, RegistryError> {
        let snapshot = self.store.models_for(make)?;
        if let Some(snapshot) = &snapshot {
            if self.clock.now() - snapshot.refreshed_at < self.reference_freshness {
                return Ok(snapshot.names.clone());
            }
        }

        match self.gateway.models_for_make(make) {
            Ok(fetched) => {
                let existing = snapshot.map(|s| s.names).unwrap_or_default();
                let merged = merge_new_names(existing, fetched);
                self.store.save_models(
                    make,
                    ReferenceSnapshot {
                        names: merged.clone(),
                        refreshed_at: self.clock.now(),
                    },
                )?;
                Ok(merged)
            }
            Err(error) => match snapshot {
                Some(stale) => {
                    warn!(%error, make, "registry model list unavailable, serving stale snapshot");
                    Ok(stale.names)
                }
                None => Err(error),
            },
        }
    }
}

/// Append only names that are case-insensitively new, preserving stored
/// order for everything already present.
fn merge_new_names(existing: Vec<String>, fetched: Vec<String>) -> Vec<String> {
    let mut seen: std::collections::HashSet<String> = existing
        .iter()
        .map(|name| name.to_ascii_lowercase())
        .collect();
    let mut merged = existing;

    for name in fetched {
        let key = name.to_ascii_lowercase();
        if seen.insert(key) {
            merged.push(name);
        }
    }

    merged
}
