//! MET Norway forecast and sunrise APIs.
//!
//! Both endpoints are free but require an identifying `User-Agent`; requests
//! without one are answered with 403.
//! See: https://api.met.no/doc/TermsOfService

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::de::opt_lenient_f64;
use crate::error::WeatherError;
use crate::http::{build_client, handle_response, trim_base_url};

const FORECAST_PATH: &str = "/weatherapi/locationforecast/2.0/complete.json";
const EPHEMERIS_PATH: &str = "/weatherapi/sunrise/2.0/.json";

/// Remote calls against MET Norway.
#[async_trait]
pub trait MetNoApi: Send + Sync {
    /// Multi-day forecast for a coordinate.
    async fn forecast(
        &self,
        user_agent: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<ForecastResult, WeatherError>;

    /// Sun and moon events for `days` days starting at `date` (`YYYY-MM-DD`),
    /// with times expressed at `offset` (`±HH:MM`).
    async fn ephemeris(
        &self,
        user_agent: &str,
        date: &str,
        days: u32,
        latitude: f64,
        longitude: f64,
        offset: &str,
    ) -> Result<EphemerisResult, WeatherError>;
}

pub struct MetNoClient {
    client: Client,
    base_url: String,
}

impl MetNoClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trim_base_url(base_url),
        })
    }
}

#[async_trait]
impl MetNoApi for MetNoClient {
    #[instrument(skip(self, user_agent), level = "debug")]
    async fn forecast(
        &self,
        user_agent: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<ForecastResult, WeatherError> {
        let url = format!("{}{}", self.base_url, FORECAST_PATH);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, user_agent)
            .query(&[("lat", latitude), ("lon", longitude)])
            .send()
            .await?;

        handle_response(response).await
    }

    #[instrument(skip(self, user_agent), level = "debug")]
    async fn ephemeris(
        &self,
        user_agent: &str,
        date: &str,
        days: u32,
        latitude: f64,
        longitude: f64,
        offset: &str,
    ) -> Result<EphemerisResult, WeatherError> {
        let url = format!("{}{}", self.base_url, EPHEMERIS_PATH);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, user_agent)
            .query(&[
                ("date", date.to_string()),
                ("days", days.to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;

        handle_response(response).await
    }
}

// ---------------------------------------------------------------------------
// locationforecast 2.0 payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastResult {
    pub properties: Option<ForecastProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastProperties {
    pub meta: Option<ForecastMeta>,
    #[serde(default)]
    pub timeseries: Vec<ForecastTimeseries>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastMeta {
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastTimeseries {
    pub time: DateTime<Utc>,
    pub data: Option<ForecastData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastData {
    pub instant: Option<ForecastInstant>,
    pub next_1_hours: Option<ForecastNextHours>,
    pub next_6_hours: Option<ForecastNextHours>,
    pub next_12_hours: Option<ForecastNextHours>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastInstant {
    pub details: Option<InstantDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstantDetails {
    pub air_pressure_at_sea_level: Option<f64>,
    pub air_temperature: Option<f64>,
    pub cloud_area_fraction: Option<f64>,
    pub dew_point_temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub wind_from_direction: Option<f64>,
    pub wind_speed: Option<f64>,
    pub ultraviolet_index_clear_sky: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastNextHours {
    pub summary: Option<NextHoursSummary>,
    pub details: Option<NextHoursDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextHoursSummary {
    pub symbol_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NextHoursDetails {
    pub precipitation_amount: Option<f64>,
    pub probability_of_precipitation: Option<f64>,
    pub air_temperature_max: Option<f64>,
    pub air_temperature_min: Option<f64>,
}

impl ForecastTimeseries {
    pub fn details(&self) -> Option<&InstantDetails> {
        self.data.as_ref()?.instant.as_ref()?.details.as_ref()
    }

    /// Shortest-period symbol available for this step.
    pub fn symbol_code(&self) -> Option<&str> {
        let data = self.data.as_ref()?;
        [&data.next_1_hours, &data.next_6_hours, &data.next_12_hours]
            .into_iter()
            .flatten()
            .find_map(|next| next.summary.as_ref()?.symbol_code.as_deref())
    }

    /// Precipitation block for this step: hourly where available, else six-hourly.
    pub fn precipitation_period(&self) -> Option<&NextHoursDetails> {
        let data = self.data.as_ref()?;
        data.next_1_hours
            .as_ref()
            .or(data.next_6_hours.as_ref())?
            .details
            .as_ref()
    }
}

// ---------------------------------------------------------------------------
// sunrise 2.0 payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EphemerisResult {
    pub location: Option<EphemerisLocation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EphemerisLocation {
    #[serde(default)]
    pub time: Vec<EphemerisDay>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EphemerisDay {
    pub date: Option<NaiveDate>,
    pub sunrise: Option<EphemerisEvent>,
    pub sunset: Option<EphemerisEvent>,
    pub moonrise: Option<EphemerisEvent>,
    pub moonset: Option<EphemerisEvent>,
    pub moonphase: Option<MoonPhase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EphemerisEvent {
    pub time: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoonPhase {
    #[serde(default, deserialize_with = "opt_lenient_f64")]
    pub value: Option<f64>,
}

impl EphemerisEvent {
    pub fn utc(&self) -> Option<DateTime<Utc>> {
        self.time.map(|t| t.with_timezone(&Utc))
    }
}

impl EphemerisResult {
    pub fn days(&self) -> &[EphemerisDay] {
        match &self.location {
            Some(location) => &location.time,
            None => &[],
        }
    }
}
