use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::Config;

/// Settings handed to every provider operation.
///
/// Cloning is cheap and clones share the same settings, so a change made
/// through `update` is seen by requests issued afterwards.
#[derive(Debug, Clone)]
pub struct AppContext {
    settings: Arc<RwLock<Config>>,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self {
            settings: Arc::new(RwLock::new(config)),
        }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.settings.read().clone()
    }

    /// Apply a change to the shared settings.
    pub fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut Config),
    {
        change(&mut *self.settings.write());
    }

    /// UI language code, e.g. `"en"` or `"zh-CN"`.
    pub fn language_code(&self) -> String {
        self.settings.read().ui.language.clone()
    }

    pub fn user_agent(&self) -> String {
        self.settings.read().user_agent()
    }

    /// Timezone assigned to locations that the geocoder returns without one.
    pub fn default_timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.settings.read().weather.timezone()
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
