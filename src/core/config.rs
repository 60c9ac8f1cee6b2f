//! Typed application configuration.
//!
//! Loaded from a TOML file (`DGMS_CONFIG_PATH` or `./config.toml`) with
//! environment-variable overrides for secrets and the listen port. Missing
//! credentials fail startup instead of deferring the error to the first
//! external call.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("missing required setting: {0} (set it in config.toml or the environment)")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub log_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_allowed_origins: Vec::new(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; overridden by `GEMINI_API_KEY`.
    pub api_key: String,
    pub base_url: String,
    pub completion_model: String,
    pub embedding_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            completion_model: "gemini-pro".to_string(),
            embedding_model: "embedding-001".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeConfig {
    /// API key; overridden by `PINECONE_API_KEY`.
    pub api_key: String,
    /// Full index host, e.g. `https://accident-datasets-xxxx.svc.us-east-1.pinecone.io`.
    /// Overridden by `PINECONE_INDEX_HOST`.
    pub index_host: String,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            index_host: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Default number of documents to retrieve when the caller omits `k`.
    pub default_k: usize,
    /// Per-stage deadline for external calls; 0 disables the timeout.
    pub request_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub pinecone: PineconeConfig,
    pub rag: RagConfig,
}

impl AppConfig {
    /// Load from the resolved config path, apply env overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::read_file(&Self::config_path())?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        env::var("DGMS_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }

    fn read_file(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Ok(key) = env::var("PINECONE_API_KEY") {
            self.pinecone.api_key = key;
        }
        if let Ok(host) = env::var("PINECONE_INDEX_HOST") {
            self.pinecone.index_host = host;
        }
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("gemini.api_key / GEMINI_API_KEY"));
        }
        if self.pinecone.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("pinecone.api_key / PINECONE_API_KEY"));
        }
        if self.pinecone.index_host.trim().is_empty() {
            return Err(ConfigError::Missing(
                "pinecone.index_host / PINECONE_INDEX_HOST",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_full_config() {
        let file = write_config(
            r#"
            [server]
            port = 8080

            [gemini]
            api_key = "g-key"
            completion_model = "gemini-pro"

            [pinecone]
            api_key = "p-key"
            index_host = "https://idx.example"

            [rag]
            default_k = 3
            "#,
        );
        let mut config = AppConfig::read_file(&file.path().to_path_buf()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rag.default_k, 3);
        assert_eq!(config.gemini.embedding_model, "embedding-001");
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let file = write_config("server = not-a-table");
        let err = AppConfig::read_file(&file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
