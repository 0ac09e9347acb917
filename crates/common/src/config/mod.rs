//! Configuration management for DocChat
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/local.toml)
//! - Default values
//!
//! The inference token may also be supplied through the bare `HF_TOKEN`
//! environment variable for parity with the usual Hugging Face tooling.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Inference backend configuration
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Upload / URL ingestion limits
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the built frontend (served as a fallback)
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite database URL
    #[serde(default = "default_db_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferenceConfig {
    /// API token for the Hugging Face Inference API
    pub token: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout in seconds. The upstream router times out at ~2 min;
    /// a shorter client timeout fails fast instead of waiting on a 504.
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,

    /// Model used for named-entity extraction
    #[serde(default = "default_ner_model")]
    pub ner_model: String,

    /// Model used for image OCR
    #[serde(default = "default_ocr_model")]
    pub ocr_model: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,

    /// Timeout for URL downloads in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_static_dir() -> String {
    "./static".to_string()
}
fn default_db_url() -> String {
    "sqlite://./data/docchat.db?mode=rwc".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_api_base() -> String {
    "https://api-inference.huggingface.co".to_string()
}
fn default_inference_timeout() -> u64 {
    120
}
fn default_ner_model() -> String {
    "dslim/bert-base-NER".to_string()
}
fn default_ocr_model() -> String {
    "microsoft/trocr-base-printed".to_string()
}
fn default_max_file_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_download_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_api_base(),
            timeout_secs: default_inference_timeout(),
            ner_model: default_ner_model(),
            ocr_model: default_ocr_model(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            download_timeout_secs: default_download_timeout(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            inference: InferenceConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;

        // HF_TOKEN fallback, matching Hugging Face conventions
        if config.inference.token.is_none() {
            if let Ok(token) = std::env::var("HF_TOKEN") {
                config.inference.token = Some(token);
            }
        }

        Ok(config)
    }

    /// Get inference request timeout as Duration
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference.timeout_secs)
    }

    /// Get URL download timeout as Duration
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.upload.download_timeout_secs)
    }
}
