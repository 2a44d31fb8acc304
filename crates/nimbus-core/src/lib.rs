//! Shared infrastructure for Nimbus: configuration, the settings context
//! handed to provider operations, logging setup and the error hierarchy.

pub mod config;
pub mod context;
pub mod error;

pub use config::{AppIdentity, Config, UiConfig, ValidationResult, WeatherConfig};
pub use context::AppContext;
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging.
///
/// Safe to call more than once; later calls leave the installed subscriber alone.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    tracing::info!("Nimbus core initialized");
    Ok(())
}
