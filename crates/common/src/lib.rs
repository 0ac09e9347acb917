//! DocChat Common Library
//!
//! Shared code for the DocChat service including:
//! - Document-grounded QA engine (context normalization, model registry,
//!   retry discipline)
//! - Hugging Face Inference API client
//! - Database models and repository
//! - Text extraction (PDF, image OCR, URL download)
//! - Named-entity extraction pipeline
//! - Error types and handling
//! - Configuration management
//! - Metrics registration

pub mod config;
pub mod db;
pub mod errors;
pub mod extract;
pub mod inference;
pub mod metrics;
pub mod ner;
pub mod qa;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use inference::{HfInferenceClient, QaBackend};
pub use qa::{AnsweringEngine, ModelRegistry};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
