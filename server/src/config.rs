//! Configuration management for the server.

use assessment_engine::Schema;
use std::env;
use std::path::PathBuf;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Base URL of the admin backend, without trailing slash
    pub backend_url: String,
    /// Static bearer token forwarded to the backend
    pub backend_token: Option<String>,
    /// Path to a category catalog JSON; the built-in catalog otherwise
    pub category_config: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let backend_url = lookup("BACKEND_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingBackendUrl)?
            .trim_end_matches('/')
            .to_string();

        let backend_token = lookup("BACKEND_TOKEN").filter(|t| !t.is_empty());
        let category_config = lookup("CATEGORY_CONFIG").map(PathBuf::from);

        Ok(Self {
            host,
            port,
            backend_url,
            backend_token,
            category_config,
        })
    }

    /// Load the category catalog this server edits.
    pub fn load_catalog(&self) -> Result<Schema, ConfigError> {
        let Some(path) = &self.category_config else {
            return Ok(Schema::assessment());
        };

        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Catalog(format!("{}: {e}", path.display())))?;
        Schema::from_json(&json).map_err(|e| ConfigError::Catalog(e.to_string()))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("BACKEND_URL environment variable is required")]
    MissingBackendUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid category catalog: {0}")]
    Catalog(String),
}
