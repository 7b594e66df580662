//! Configuration management
//!
//! Connection settings stored in a TOML file.
//! Priority: CLI argument > CLI3_* environment variables > config.toml > defaults

use super::Result;
use crate::api::client::{ApiClient, DEFAULT_TIMEOUT_SECS};
use crate::error::{ConfigError, StorageError};
use crate::utils::validation::{validate_port, validate_schema, validate_server};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SCHEMA: &str = "common";

const APP_DIR: &str = "cli3";
const CONFIG_FILE: &str = "config.toml";

pub const ENV_SERVER: &str = "CLI3_SERVER";
pub const ENV_PORT: &str = "CLI3_PORT";
pub const ENV_SCHEMA: &str = "CLI3_SCHEMA";
pub const ENV_USERNAME: &str = "CLI3_USERNAME";
pub const ENV_PASSWORD: &str = "CLI3_PASSWORD";

/// Keys accepted by [`Config::set`].
pub const KEYS: [&str; 6] = [
    "server",
    "port",
    "schema",
    "username",
    "cache_dir",
    "timeout_seconds",
];

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Application configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Directory for the reference-table cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            schema: default_schema(),
            username: None,
            cache_dir: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from file; a missing file yields the defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::config_file_path()?,
        };

        if !config_path.exists() {
            log::debug!("No config at {}, using defaults", config_path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path).map_err(|source| StorageError::FileIo {
            path: config_path.to_string_lossy().to_string(),
            source,
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|e| StorageError::ConfigParseError {
                message: format!("Failed to parse config file: {}", e),
            })?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<PathBuf>) -> Result<()> {
        let config_path = match path {
            Some(p) => p,
            None => Self::config_file_path()?,
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::FileIo {
                path: parent.to_string_lossy().to_string(),
                source,
            })?;
        }

        let toml_content = toml::to_string(self).map_err(|e| StorageError::ConfigParseError {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&config_path, toml_content).map_err(|source| StorageError::FileIo {
            path: config_path.to_string_lossy().to_string(),
            source,
        })?;

        Ok(())
    }

    /// `~/.config/cli3/config.toml`
    pub fn config_file_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().ok_or(StorageError::ConfigDirNotFound)?;
        Ok(Self::config_file_in(&home_dir.join(".config").join(APP_DIR)))
    }

    pub fn config_file_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }

    /// Overlay `CLI3_*` environment variables
    pub fn apply_env(&mut self) -> std::result::Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; empty values are ignored
    pub fn apply_env_from<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(server) = get(ENV_SERVER) {
            validate_server(&server)?;
            self.server = server;
        }
        if let Some(port) = get(ENV_PORT) {
            self.port = validate_port(&port)?;
        }
        if let Some(schema) = get(ENV_SCHEMA) {
            validate_schema(&schema)?;
            self.schema = schema;
        }
        if let Some(username) = get(ENV_USERNAME) {
            self.username = Some(username);
        }
        Ok(())
    }

    /// Set one key from its string form, validating the value
    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigError> {
        match key {
            "server" => {
                validate_server(value)?;
                self.server = value.to_string();
            }
            "port" => self.port = validate_port(value)?,
            "schema" => {
                validate_schema(value)?;
                self.schema = value.to_string();
            }
            "username" => {
                self.username = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            "cache_dir" => {
                self.cache_dir = Some(PathBuf::from(value)).filter(|p| !p.as_os_str().is_empty());
            }
            "timeout_seconds" => {
                self.timeout_seconds = match value.trim().parse::<u64>() {
                    Ok(secs) if secs > 0 => secs,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            field: key.to_string(),
                            value: value.to_string(),
                            reason: "timeout must be a positive number of seconds".to_string(),
                        });
                    }
                };
            }
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: key.to_string(),
                    value: value.to_string(),
                    reason: format!("unknown key, expected one of: {}", KEYS.join(", ")),
                });
            }
        }
        Ok(())
    }

    /// `http://<server>:<port>/<schema>`
    pub fn base_url(&self) -> String {
        ApiClient::schema_url(&self.server, self.port, &self.schema)
    }

    /// Cache directory for reference tables: configured, or the platform cache dir
    pub fn resolve_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::cache_dir()
                .map(|dir| dir.join(APP_DIR).join("nci").join(&self.schema))
                .ok_or(StorageError::CacheDirNotFound),
        }
    }

    /// Password from `CLI3_PASSWORD`, never stored in the file
    pub fn password_from_env() -> Option<String> {
        std::env::var(ENV_PASSWORD).ok().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.schema, "common");
        assert!(config.username.is_none());
        assert_eq!(config.base_url(), "http://127.0.0.1:8000/common");
    }

    #[test]
    fn test_config_load_save() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = Config::config_file_in(temp_dir.path());

        let mut config = Config::default();
        config.set("server", "reports.local").unwrap();
        config.set("port", "9000").unwrap();
        config.set("username", "ann").unwrap();

        config
            .save(Some(config_path.clone()))
            .expect("Failed to save config");

        let loaded = Config::load(Some(config_path)).expect("Failed to load config");
        assert_eq!(loaded, config);
        assert_eq!(loaded.base_url(), "http://reports.local:9000/common");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "schema = \"sales\"\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.schema, "sales");
        assert_eq!(config.server, DEFAULT_SERVER);
        assert_eq!(config.timeout_seconds, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = Config::load(Some(temp_dir.path().join("nonexistent.toml")))
            .expect("Failed to load default config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_malformed_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "port = \"not a number\"").unwrap();

        let result = Config::load(Some(config_path));
        assert!(matches!(result, Err(StorageError::ConfigParseError { .. })));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_SERVER, "10.0.0.5"),
            (ENV_PORT, "8443"),
            (ENV_USERNAME, "bob"),
            (ENV_SCHEMA, ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server, "10.0.0.5");
        assert_eq!(config.port, 8443);
        assert_eq!(config.username.as_deref(), Some("bob"));
        assert_eq!(config.schema, DEFAULT_SCHEMA, "empty values are ignored");
    }

    #[test]
    fn test_env_rejects_invalid_port() {
        let mut config = Config::default();
        let result = config.apply_env_from(|key| (key == ENV_PORT).then(|| "abc".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_set_unknown_key() {
        let mut config = Config::default();
        assert!(config.set("colour", "blue").is_err());
        assert!(config.set("timeout_seconds", "0").is_err());
        config.set("timeout_seconds", "90").unwrap();
        assert_eq!(config.timeout_seconds, 90);
    }

    #[test]
    fn test_resolve_cache_dir_prefers_configured() {
        let mut config = Config::default();
        config.set("cache_dir", "/tmp/cli3-cache").unwrap();
        assert_eq!(
            config.resolve_cache_dir().unwrap(),
            PathBuf::from("/tmp/cli3-cache")
        );
    }
}
