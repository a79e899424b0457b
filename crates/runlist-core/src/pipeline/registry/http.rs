use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::Runtime;

use super::super::vin::Vin;
use super::{DecodedVehicle, RegistryError, RegistryGateway};

/// Thin wrapper around an async HTTP client so the synchronous pipeline can
/// talk to the registry without exposing async details. Owns its runtime.
pub struct HttpRegistryClient {
    client: reqwest::Client,
    base_url: String,
    runtime: Runtime,
}

impl HttpRegistryClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Self::map_error)?;
        let runtime = Runtime::new().map_err(|err| RegistryError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            runtime,
        })
    }

    fn map_error<E: std::fmt::Display>(err: E) -> RegistryError {
        RegistryError::Transport(err.to_string())
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, RegistryError> {
        self.runtime.block_on(async {
            self.client
                .get(&url)
                .send()
                .await
                .map_err(Self::map_error)?
                .error_for_status()
                .map_err(Self::map_error)?
                .json::<T>()
                .await
                .map_err(|err| RegistryError::Malformed(err.to_string()))
        })
    }
}

impl std::fmt::Debug for HttpRegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistryClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "Results", default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MakeRow {
    #[serde(rename = "Make_Name")]
    make_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelRow {
    #[serde(rename = "Model_Name")]
    model_name: Option<String>,
}

impl RegistryGateway for HttpRegistryClient {
    fn decode_vin(&self, vin: &Vin) -> Result<DecodedVehicle, RegistryError> {
        let url = format!(
            "{}/vehicles/DecodeVinValues/{}?format=json",
            self.base_url, vin
        );
        let envelope: Envelope<HashMap<String, serde_json::Value>> = self.get_json(url)?;
        let row = envelope
            .results
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::Malformed("empty decode result set".to_string()))?;

        Ok(decoded_from_row(row))
    }

    fn all_makes(&self) -> Result<Vec<String>, RegistryError> {
        let url = format!("{}/vehicles/GetAllMakes?format=json", self.base_url);
        let envelope: Envelope<MakeRow> = self.get_json(url)?;
        Ok(envelope
            .results
            .into_iter()
            .filter_map(|row| row.make_name)
            .filter(|name| !name.trim().is_empty())
            .collect())
    }

    fn models_for_make(&self, make: &str) -> Result<Vec<String>, RegistryError> {
        let url = format!(
            "{}/vehicles/GetModelsForMake/{}?format=json",
            self.base_url, make
        );
        let envelope: Envelope<ModelRow> = self.get_json(url)?;
        Ok(envelope
            .results
            .into_iter()
            .filter_map(|row| row.model_name)
            .filter(|name| !name.trim().is_empty())
            .collect())
    }
}

/// The registry reports unknown attributes as empty strings or nulls; drop
/// those so absence stays absence.
fn decoded_from_row(row: HashMap<String, serde_json::Value>) -> DecodedVehicle {
    let attributes = row
        .into_iter()
        .filter_map(|(name, value)| match value {
            serde_json::Value::String(text) if !text.trim().is_empty() => Some((name, text)),
            serde_json::Value::Number(number) => Some((name, number.to_string())),
            _ => None,
        })
        .collect();

    DecodedVehicle { attributes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_rows_drop_empty_and_null_attributes() {
        let row: HashMap<String, serde_json::Value> = serde_json::from_value(json!({
            "Make": "HONDA",
            "Model": "Accord",
            "ModelYear": "2003",
            "Trim": "",
            "Note": null,
        }))
        .unwrap();

        let decoded = decoded_from_row(row);
        assert_eq!(decoded.make(), Some("HONDA"));
        assert_eq!(decoded.model_year(), Some(2003));
        assert_eq!(decoded.trim_level(), None);
        assert!(!decoded.attributes.contains_key("Note"));
    }

    #[test]
    fn envelope_tolerates_missing_results() {
        let envelope: Envelope<MakeRow> = serde_json::from_value(json!({
            "Count": 0,
            "Message": "ok",
        }))
        .unwrap();
        assert!(envelope.results.is_empty());
    }

    #[test]
    fn make_rows_with_blank_names_are_skipped() {
        let envelope: Envelope<MakeRow> = serde_json::from_value(json!({
            "Results": [
                {"Make_ID": 474, "Make_Name": "HONDA"},
                {"Make_ID": 475, "Make_Name": "  "},
                {"Make_ID": 476},
            ],
        }))
        .unwrap();

        let names: Vec<String> = envelope
            .results
            .into_iter()
            .filter_map(|row| row.make_name)
            .filter(|name| !name.trim().is_empty())
            .collect();
        assert_eq!(names, vec!["HONDA"]);
    }
}
