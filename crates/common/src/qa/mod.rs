//! Document-grounded question answering
//!
//! The QA pipeline takes the text of a chat's enabled documents plus a
//! bounded window of prior conversation turns, normalizes them into one
//! answerable context, and drives an extractive QA backend with a bounded
//! retry/backoff policy for transient upstream failures.

mod context;
mod engine;
mod models;

pub use context::{normalize, ContextInput, ConversationTurn, HISTORY_MARKER};
pub use engine::{
    AnswerResult, AnsweringEngine, EMPTY_CONTEXT_FALLBACK, MAX_RETRIES, RETRY_BACKOFF_BASE,
};
pub use models::{ModelConfig, ModelRegistry, ModelSummary};

/// Number of prior conversation turns folded into the context
pub const HISTORY_LIMIT: u64 = 5;
