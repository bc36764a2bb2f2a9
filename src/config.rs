use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::persist::PersistenceMode;

/// Name of the optional settings file looked up in the working directory.
pub const DEFAULT_FILE: &str = "sta.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Public base URL of the SensorThings endpoint, used in every link
    #[serde(default = "default_service_root")]
    pub service_root: String,

    /// Base URL of the native platform API (the one serving /boxes)
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Where Datastream identities live: json, sqlite or memory
    #[serde(default = "default_identity_backend")]
    pub identity_backend: String,

    #[serde(default = "default_identity_path")]
    pub identity_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_service_root() -> String {
    "http://localhost:8000/v1.1".to_string()
}

fn default_upstream_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_identity_backend() -> String {
    "json".to_string()
}

fn default_identity_path() -> String {
    "sta_references.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Reads `sta.toml` (or the file named by `STA_CONFIG`) if present, then `STA_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("STA_CONFIG").unwrap_or_else(|_| DEFAULT_FILE.to_string());
        Self::load_from(file)
    }

    pub fn load_from(file: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(file.as_ref()).required(false))
            .add_source(Environment::with_prefix("STA"))
            .build()?
            .try_deserialize()
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn persistence_mode(&self) -> Result<PersistenceMode, ConfigError> {
        let path = PathBuf::from(&self.identity_path);
        match self.identity_backend.to_lowercase().as_str() {
            "json" => Ok(PersistenceMode::Json(path)),
            "sqlite" => Ok(PersistenceMode::Sqlite(path)),
            "memory" => Ok(PersistenceMode::InMemory),
            other => Err(ConfigError::Message(format!("unknown identity backend '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::load_from("does-not-exist.toml").unwrap();
        assert_eq!(settings.service_root, "http://localhost:8000/v1.1");
        assert_eq!(settings.upstream_timeout(), Duration::from_secs(30));
        assert_eq!(
            settings.persistence_mode().unwrap(),
            PersistenceMode::Json(PathBuf::from("sta_references.json"))
        );
    }

    #[test]
    fn test_file_settings() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "service_root = \"https://sta.example.org/v1.1/\"").unwrap();
        writeln!(file, "identity_backend = \"sqlite\"").unwrap();
        writeln!(file, "identity_path = \"refs.db\"").unwrap();
        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.service_root, "https://sta.example.org/v1.1/");
        assert_eq!(
            settings.persistence_mode().unwrap(),
            PersistenceMode::Sqlite(PathBuf::from("refs.db"))
        );
    }

    #[test]
    fn test_unknown_backend() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "identity_backend = \"mongodb\"").unwrap();
        let settings = Settings::load_from(file.path()).unwrap();
        assert!(settings.persistence_mode().is_err());
    }
}
