//! Configuration management for the agent panel.
//!
//! Configuration can be set via environment variables:
//! - `OLLAMA_URL` - Optional. Base URL of the Ollama server. Defaults to `http://127.0.0.1:11434`.
//! - `DEFAULT_MODEL` - Optional. Model assigned to new agents when none is given. Defaults to `llama2`.
//! - `DATA_DIR` - Optional. Directory for the group store file. Defaults to `./data`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.

use std::path::PathBuf;
use thiserror::Error;

use crate::llm::DEFAULT_OLLAMA_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Panel configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Ollama server
    pub ollama_url: String,

    /// Default model for new agents
    pub default_model: String,

    /// Directory holding the persisted group store
    pub data_dir: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let ollama_url =
            std::env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| "llama2".to_string());

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        Ok(Self {
            ollama_url,
            default_model,
            data_dir,
            host,
            port,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(ollama_url: String, default_model: String, data_dir: PathBuf) -> Self {
        Self {
            ollama_url,
            default_model,
            data_dir,
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}
