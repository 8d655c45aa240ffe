use crate::error::ConfigError;
use crate::network::{DEFAULT_PORT, DEFAULT_TIMEOUT_SECONDS};
use crate::player::ai::AIConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "connect_four.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub port: u16,
    pub connect_timeout_secs: u64,
    /// CONNECT で送る表示名
    pub player_name: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            port: DEFAULT_PORT,
            connect_timeout_secs: DEFAULT_TIMEOUT_SECONDS,
            player_name: "Player".to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub ai: AIConfig,
}

impl AppConfig {
    /// Reads `connect_four.json` from the working directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Missing file means defaults; a broken one is logged and ignored.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(ConfigError::FileRead { .. }) => AppConfig::default(),
            Err(e) => {
                tracing::warn!("{}: {}, using defaults", CONFIG_FILE, e);
                AppConfig::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "connect_timeout_secs must be >= 1".to_string(),
            ));
        }
        if self.network.player_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "player_name must not be empty".to_string(),
            ));
        }
        self.ai.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.network.port, 4444);
        assert_eq!(config.network.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.network.player_name, "Player");
        assert_eq!(config.ai.hard_depth, 6);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config = AppConfig::from_json(r#"{"network": {"port": 5000}}"#).unwrap();
        assert_eq!(config.network.port, 5000);
        assert_eq!(config.network.connect_timeout_secs, 30);
        assert_eq!(config.ai, AIConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = AppConfig::from_json(r#"{"ai": {"hard_depth": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = AppConfig::from_json(r#"{"network": {"player_name": "  "}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err =
            AppConfig::from_json(r#"{"network": {"connect_timeout_secs": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = AppConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AppConfig::load_from(Path::new("/nonexistent/connect_four.json")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
