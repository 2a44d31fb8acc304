//! Weather-provider error types.

use nimbus_core::{AppError, ConfigError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider returned no usable data: {0}")]
    EmptyResult(String),

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        WeatherError::Network(e.into_network_error())
    }
}

impl WeatherError {
    /// Whether the provider reported that our request quota is exhausted.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_rate_limited())
    }

    /// Whether the provider rejected the request's identity.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_unauthorized())
    }

    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(e) => e.user_message(),
            Self::Parse(_) => "Received unexpected weather data. Please try again.",
            Self::EmptyResult(_) => "No weather data is available for this place.",
            Self::Conversion(_) => "Weather data could not be read. Please try again.",
            Self::Config(e) => e.user_message(),
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Network(n) => AppError::Network(n),
            WeatherError::Config(c) => AppError::Config(c),
            other => AppError::Service(other.to_string()),
        }
    }
}
