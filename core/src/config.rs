// Symposium Configuration Module
// Environment-driven runtime settings

use std::path::PathBuf;

/// Listen port used when neither `PORT` nor `NODE_PORT` is set.
pub const DEFAULT_PORT: u16 = 3003;

/// Directory holding persistent engine state.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Runtime settings for the engine, resolved once at startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Directory for persistent state such as the failed-model store.
    pub data_dir: PathBuf,
    /// How long a fetched model catalog stays fresh, in seconds.
    pub catalog_ttl_secs: u64,
    /// Upper bound on waiting for an upstream response head, in seconds.
    pub request_timeout_secs: u64,
}

impl EngineConfig {
    /// Builds a configuration from the process environment.
    ///
    /// The port comes from `PORT`, then `NODE_PORT`, then [DEFAULT_PORT].
    /// Values that do not parse as a port are skipped.
    pub fn from_env() -> Self {
        let port = ["PORT", "NODE_PORT"]
            .into_iter()
            .find_map(|name| std::env::var(name).ok()?.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self {
            port,
            ..Self::default()
        }
    }

    /// Location of the persisted failed-model records.
    pub fn failed_models_path(&self) -> PathBuf {
        self.data_dir.join("failed-models.json")
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            catalog_ttl_secs: crate::model::catalog::CATALOG_TTL_SECS,
            request_timeout_secs: crate::model::client::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_server_conventions() {
        let config = EngineConfig::default();
        assert_eq!(config.port, 3003);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.catalog_ttl_secs, 600);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn failed_models_path_lives_under_data_dir() {
        let mut config = EngineConfig::default();
        config.data_dir = PathBuf::from("/tmp/engine-state");
        assert_eq!(
            config.failed_models_path(),
            PathBuf::from("/tmp/engine-state/failed-models.json")
        );
    }
}
