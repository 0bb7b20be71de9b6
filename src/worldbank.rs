//! World Bank indicator API client and raw observation types.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Default indicator endpoint: PPP conversion factor for all countries,
/// requested as a single page.
pub const DEFAULT_INDICATOR_URL: &str =
    "https://api.worldbank.org/v2/country/all/indicator/PA.NUS.PPP?format=json&per_page=30000";

/// Default outbound request timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// One observation as delivered by the indicator API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawObservation {
    /// ISO3 country identifier.
    #[serde(rename = "countryiso3code")]
    pub country_code: String,
    /// Nested country descriptor.
    pub country: CountryRef,
    /// Observation year as a string of digits.
    pub date: String,
    /// PPP index value; null for years without data.
    pub value: Option<f64>,
}

/// Nested `country` object inside an observation.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryRef {
    /// Human-readable country name.
    pub value: String,
}

/// HTTP client for the configured indicator endpoint.
#[derive(Clone)]
pub struct WorldBankClient {
    http: Client,
    endpoint: Url,
}

impl WorldBankClient {
    /// Builds a client with a fixed request timeout.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build World Bank HTTP client")?;
        Ok(Self { http, endpoint })
    }

    /// Endpoint this client fetches from.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches the full observation array for the configured indicator.
    ///
    /// Network errors, timeouts, and malformed payloads propagate to the
    /// caller; there is no retry.
    pub async fn fetch_all(&self) -> Result<Vec<RawObservation>> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .context("World Bank request failed")?;
        let status = response.status();
        anyhow::ensure!(status.is_success(), "World Bank responded with {status}");
        let payload: Value = response
            .json()
            .await
            .context("failed to parse World Bank response body")?;
        parse_envelope(payload)
    }
}

/// Extracts the observation array from the two-element response envelope.
///
/// The API returns `[pagination, observations]`. The pagination object is
/// skipped by shape rather than position, so a reordered envelope still
/// parses. An observation missing a required field fails the whole parse.
pub fn parse_envelope(payload: Value) -> Result<Vec<RawObservation>> {
    let Value::Array(items) = payload else {
        anyhow::bail!("expected a top-level JSON array from the World Bank API");
    };
    let observations = items
        .into_iter()
        .find(|item| item.is_array())
        .context("World Bank response contains no observation array")?;
    serde_json::from_value(observations).context("malformed observation record")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_standard_envelope() {
        let payload = json!([
            {"page": 1, "pages": 1, "per_page": 30000, "total": 2},
            [
                {
                    "countryiso3code": "USA",
                    "country": {"id": "US", "value": "United States"},
                    "date": "2021",
                    "value": 1.1
                },
                {
                    "countryiso3code": "IND",
                    "country": {"id": "IN", "value": "India"},
                    "date": "2019",
                    "value": null
                }
            ]
        ]);

        let observations = parse_envelope(payload).expect("envelope parses");
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].country_code, "USA");
        assert_eq!(observations[0].country.value, "United States");
        assert_eq!(observations[0].value, Some(1.1));
        assert_eq!(observations[1].value, None);
    }

    #[test]
    fn locates_observations_regardless_of_position() {
        let payload = json!([
            [{
                "countryiso3code": "FRA",
                "country": {"id": "FR", "value": "France"},
                "date": "2018",
                "value": 0.72
            }],
            {"page": 1}
        ]);

        let observations = parse_envelope(payload).expect("envelope parses");
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].country_code, "FRA");
    }

    #[test]
    fn rejects_envelope_without_observation_array() {
        let payload = json!([{"page": 1}, {"message": "no data"}]);
        assert!(parse_envelope(payload).is_err());
    }

    #[test]
    fn rejects_record_missing_required_fields() {
        let payload = json!([
            {"page": 1},
            [{"countryiso3code": "USA", "date": "2021", "value": 1.0}]
        ]);
        assert!(parse_envelope(payload).is_err());
    }
}
