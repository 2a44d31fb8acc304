use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Weather condition categories mapped from MET Norway symbol codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    LightRain,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert a MET Norway `symbol_code` to a WeatherCondition.
    ///
    /// Codes carry an optional `_day`, `_night` or `_polartwilight` suffix which
    /// does not affect the category.
    /// See: https://api.met.no/weatherapi/weathericon/2.0/documentation
    pub fn from_symbol_code(code: &str) -> Self {
        let base = code.split('_').next().unwrap_or(code);

        if base.contains("thunder") {
            return Self::Thunderstorm;
        }
        if base.contains("sleet") {
            return Self::Sleet;
        }
        if base.contains("snow") {
            return Self::Snow;
        }
        if base.contains("rain") {
            return if base.starts_with("heavy") {
                Self::HeavyRain
            } else if base.starts_with("light") {
                Self::LightRain
            } else {
                Self::Rain
            };
        }

        match base {
            "clearsky" => Self::Clear,
            "fair" | "partlycloudy" => Self::PartlyCloudy,
            "cloudy" => Self::Cloudy,
            "fog" => Self::Fog,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::LightRain => "Light Rain",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    pub fn is_precipitation(&self) -> bool {
        matches!(
            self,
            Self::LightRain
                | Self::Rain
                | Self::HeavyRain
                | Self::Snow
                | Self::Sleet
                | Self::Thunderstorm
        )
    }
}

/// Geographic location, optionally carrying the weather fetched for it.
///
/// Provider operations never modify a Location; they hand back copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: Tz,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub weather: Option<WeatherData>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, timezone: Tz) -> Self {
        Self {
            city_id: None,
            latitude,
            longitude,
            timezone,
            country: None,
            country_code: None,
            province: None,
            city: None,
            district: None,
            weather: None,
        }
    }

    /// Composite `"<lat>,<lon>"` key identifying a coordinate request.
    ///
    /// Uses the shortest form that round-trips, so whole numbers have no
    /// fractional part: `(1.0, 2.0)` gives `"1,2"`, not `"1.0,2.0"`. Hosts
    /// matching keys produced elsewhere must normalize accordingly.
    pub fn key(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }

    /// Copy of this location with `weather` attached.
    pub fn with_weather(&self, weather: WeatherData) -> Self {
        Self {
            weather: Some(weather),
            ..self.clone()
        }
    }

    /// Best available place name, e.g. "Oslo, Norway".
    pub fn display_name(&self) -> String {
        let place = self
            .district
            .as_ref()
            .or(self.city.as_ref())
            .or(self.province.as_ref());

        match (place, self.country.as_ref()) {
            (Some(p), Some(c)) if p != c => format!("{}, {}", p, c),
            (Some(p), _) => p.clone(),
            (None, Some(c)) => c.clone(),
            (None, None) => self.key(),
        }
    }
}

/// Current weather conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Air temperature in °C
    pub temperature: f64,
    pub dew_point: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
    /// Sea-level pressure in hPa
    pub pressure: Option<f64>,
    /// Cloud area fraction in percent
    pub cloud_cover: Option<f64>,
    /// Wind speed in m/s
    pub wind_speed: Option<f64>,
    /// Direction the wind blows from, in degrees
    pub wind_direction: Option<f64>,
    pub uv_index: Option<f64>,
    pub condition: WeatherCondition,
    pub observed_at: DateTime<Utc>,
}

/// Hourly forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub time: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub condition: WeatherCondition,
    /// Precipitation amount in mm over the hour
    pub precipitation: Option<f64>,
    pub precipitation_probability: Option<f64>,
}

/// Daily forecast entry, keyed by the location's local date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub day_condition: WeatherCondition,
    pub night_condition: WeatherCondition,
    /// Total precipitation in mm
    pub precipitation: f64,
    pub precipitation_probability: Option<f64>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub moonrise: Option<DateTime<Utc>>,
    pub moonset: Option<DateTime<Utc>>,
    /// Moon phase on MET's 0–100 scale (0 new, 50 full)
    pub moon_phase: Option<f64>,
}

/// Complete weather data bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub updated_at: DateTime<Utc>,
    pub current: CurrentWeather,
    pub daily: Vec<DayForecast>,
    pub hourly: Vec<HourlyForecast>,
}
