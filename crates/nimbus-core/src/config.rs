use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_METNO_BASE_URL: &str = "https://api.met.no";
pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identity reported to upstream providers
    #[serde(default)]
    pub app: AppIdentity,

    /// UI preferences
    #[serde(default)]
    pub ui: UiConfig,

    /// Weather provider settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// How the app identifies itself in the `User-Agent` header.
///
/// Both MET Norway and Nominatim require a descriptive agent with contact
/// information and reject generic ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppIdentity {
    pub name: String,
    pub version: String,
    pub issue_tracker: String,
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            name: "Nimbus".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            issue_tracker: "github.com/nimbus-weather/nimbus/issues".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Language code sent as `accept-language` to the geocoder
    pub language: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// IANA timezone assigned to locations found by text search
    #[serde(default = "default_timezone_name")]
    pub default_timezone: String,

    /// HTTP timeout for provider requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_metno_base_url")]
    pub metno_base_url: String,

    #[serde(default = "default_nominatim_base_url")]
    pub nominatim_base_url: String,
}

fn default_timezone_name() -> String {
    "UTC".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_metno_base_url() -> String {
    DEFAULT_METNO_BASE_URL.to_string()
}

fn default_nominatim_base_url() -> String {
    DEFAULT_NOMINATIM_BASE_URL.to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone_name(),
            request_timeout_secs: default_request_timeout_secs(),
            metno_base_url: default_metno_base_url(),
            nominatim_base_url: default_nominatim_base_url(),
        }
    }
}

impl WeatherConfig {
    /// Parse `default_timezone` into a chrono-tz zone.
    pub fn timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.default_timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            ConfigError::Invalid(format!(
                "weather.default_timezone: unknown timezone '{}'",
                self.default_timezone
            ))
        })
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppIdentity::default(),
            ui: UiConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// User agent in the form `<AppName>/<Version> <issue-tracker-url>`.
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} {}",
            self.app.name, self.app.version, self.app.issue_tracker
        )
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, writing defaults there on first run.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load_validated_from(&Self::config_path()?)
    }

    pub fn load_validated_from(config_path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(config_path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.app.name.trim().is_empty() {
            result.add_error("app.name", "Application name must not be empty");
        }
        if self.app.issue_tracker.trim().is_empty() {
            result.add_warning(
                "app.issue_tracker",
                "No contact URL in the user agent; providers may block requests",
            );
        }

        if self.ui.language.trim().is_empty() {
            result.add_error("ui.language", "Language code must not be empty");
        }

        if let Err(e) = self.weather.timezone() {
            result.add_error("weather.default_timezone", e.to_string());
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is more than 2 minutes",
            );
        }

        self.validate_url(
            &self.weather.metno_base_url,
            "weather.metno_base_url",
            &mut result,
        );
        self.validate_url(
            &self.weather.nominatim_base_url,
            "weather.nominatim_base_url",
            &mut result,
        );

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// `<user config dir>/nimbus/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("nimbus");

        Ok(config_dir.join("config.toml"))
    }
}
