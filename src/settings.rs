use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{LogicadError, Result};

/// Service configuration, merged from struct defaults, an optional
/// `logicad.*` config file, and `LOGICAD_*` environment variables (later
/// sources win).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// HTTP bind address.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Runtime used for the engine's module-invocation forms.
    #[serde(default = "default_python_runtime")]
    pub python_runtime: String,
    /// Installed engine executable used for the binary strategy.
    #[serde(default = "default_engine_binary")]
    pub engine_binary: String,
    /// Hard timeout per invocation attempt, in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_owned()
}
fn default_python_runtime() -> String {
    "python3".to_owned()
}
fn default_engine_binary() -> String {
    "logica".to_owned()
}
fn default_query_timeout_secs() -> u64 {
    120
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            python_runtime: default_python_runtime(),
            engine_binary: default_engine_binary(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let merged = Config::builder()
            .add_source(File::with_name("logicad").required(false))
            .add_source(Environment::with_prefix("LOGICAD"))
            .build()
            .map_err(|e| LogicadError::Config(e.to_string()))?;
        merged
            .try_deserialize()
            .map_err(|e| LogicadError::Config(e.to_string()))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_engine_conventions() {
        let settings = Settings::default();
        assert_eq!(settings.python_runtime, "python3");
        assert_eq!(settings.engine_binary, "logica");
        assert_eq!(settings.query_timeout_secs, 120);
    }

    #[test]
    fn timeout_is_seconds() {
        let settings = Settings { query_timeout_secs: 3, ..Settings::default() };
        assert_eq!(settings.query_timeout(), Duration::from_secs(3));
    }
}
