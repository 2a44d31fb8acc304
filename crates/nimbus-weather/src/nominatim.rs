//! Geocoding through Nominatim (OpenStreetMap) - free, no API key required,
//! but every request must carry an identifying `User-Agent`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::de::lenient_f64;
use crate::error::WeatherError;
use crate::http::{build_client, handle_response, trim_base_url};

/// Fixed request flags shared by forward and reverse lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeParams {
    pub user_agent: String,
    pub language: String,
    pub feature_type: String,
    pub dedupe: bool,
    pub format: String,
}

impl GeocodeParams {
    /// City-level lookup in Nominatim's `jsonv2` format, duplicates removed.
    pub fn city(user_agent: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            language: language.into(),
            feature_type: "city".to_string(),
            dedupe: true,
            format: "jsonv2".to_string(),
        }
    }

    fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("featuretype", self.feature_type.clone()),
            ("dedupe", self.dedupe.to_string()),
            ("accept-language", self.language.clone()),
            ("format", self.format.clone()),
        ]
    }
}

/// Remote calls against a Nominatim instance.
#[async_trait]
pub trait NominatimApi: Send + Sync {
    /// Free-text search.
    async fn search(
        &self,
        params: &GeocodeParams,
        query: &str,
    ) -> Result<Vec<NominatimLocationResult>, WeatherError>;

    /// Reverse lookup. `Ok(None)` when nothing is known at the coordinate.
    async fn reverse(
        &self,
        params: &GeocodeParams,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<NominatimLocationResult>, WeatherError>;
}

pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trim_base_url(base_url),
        })
    }
}

#[async_trait]
impl NominatimApi for NominatimClient {
    #[instrument(skip(self, params), level = "debug")]
    async fn search(
        &self,
        params: &GeocodeParams,
        query: &str,
    ) -> Result<Vec<NominatimLocationResult>, WeatherError> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, params.user_agent.as_str())
            .query(&[("q", query)])
            .query(&params.query_pairs())
            .send()
            .await?;

        let results: Option<Vec<NominatimLocationResult>> = handle_response(response).await?;
        Ok(results.unwrap_or_default())
    }

    #[instrument(skip(self, params), level = "debug")]
    async fn reverse(
        &self,
        params: &GeocodeParams,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<NominatimLocationResult>, WeatherError> {
        let url = format!("{}/reverse", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, params.user_agent.as_str())
            .query(&[("lat", latitude), ("lon", longitude)])
            .query(&params.query_pairs())
            .send()
            .await?;

        let body: serde_json::Value = handle_response(response).await?;
        parse_reverse_body(body)
    }
}

/// Nominatim answers an unknown coordinate with 200 and `{"error": "..."}`.
fn parse_reverse_body(
    body: serde_json::Value,
) -> Result<Option<NominatimLocationResult>, WeatherError> {
    if body.is_null() {
        return Ok(None);
    }
    if let Some(reason) = body.get("error") {
        tracing::debug!("Reverse geocode found nothing: {}", reason);
        return Ok(None);
    }

    serde_json::from_value(body)
        .map(Some)
        .map_err(|e| WeatherError::Parse(format!("Nominatim place: {}", e)))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NominatimLocationResult {
    pub place_id: Option<u64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lon: f64,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
    pub address: Option<NominatimAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NominatimAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub suburb: Option<String>,
    pub city_district: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

impl NominatimAddress {
    /// Prefer city > town > village > municipality for the primary place name
    pub fn place(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.town.as_deref())
            .or(self.village.as_deref())
            .or(self.municipality.as_deref())
    }

    pub fn district(&self) -> Option<&str> {
        self.suburb.as_deref().or(self.city_district.as_deref())
    }

    pub fn region(&self) -> Option<&str> {
        self.state.as_deref().or(self.county.as_deref())
    }
}
