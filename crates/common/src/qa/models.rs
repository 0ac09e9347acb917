//! Static catalog of extractive QA models
//!
//! The catalog is defined at process start and never mutated. Lookup is a
//! linear scan; the catalog is small enough that indexing would buy nothing.

use crate::errors::{AppError, Result};
use serde::Serialize;

/// One configured QA backend model
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Short stable id used in the API and storage
    pub id: &'static str,
    /// Human-readable label
    pub name: &'static str,
    /// Identifier passed to the inference backend
    pub model: &'static str,
}

/// Public view of a model: id and label only, backend identifier hidden
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModelSummary {
    pub id: String,
    pub name: String,
}

const MODELS: &[ModelConfig] = &[
    ModelConfig {
        id: "tinybert",
        name: "TinyBERT",
        model: "Intel/dynamic_tinybert",
    },
    ModelConfig {
        id: "distilbert",
        name: "DistilBERT",
        model: "distilbert/distilbert-base-cased-distilled-squad",
    },
    ModelConfig {
        id: "roberta-base",
        name: "RoBERTa Base",
        model: "deepset/roberta-base-squad2",
    },
    ModelConfig {
        id: "roberta-large",
        name: "RoBERTa Large",
        model: "deepset/roberta-large-squad2",
    },
    ModelConfig {
        id: "bert-large",
        name: "BERT Large",
        model: "bert-large-uncased-whole-word-masking-finetuned-squad",
    },
];

const DEFAULT_MODEL_ID: &str = "distilbert";

/// Registry over the static model catalog
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry;

impl ModelRegistry {
    pub fn new() -> Self {
        Self
    }

    /// The process-wide default model id
    pub fn default_id(&self) -> &'static str {
        DEFAULT_MODEL_ID
    }

    /// List models for the UI dropdown (id and name only)
    pub fn list(&self) -> Vec<ModelSummary> {
        MODELS
            .iter()
            .map(|m| ModelSummary {
                id: m.id.to_string(),
                name: m.name.to_string(),
            })
            .collect()
    }

    /// Resolve a model id to its configuration. `None` resolves to the
    /// default. An unknown id is a caller bug, never retried.
    pub fn resolve(&self, model_id: Option<&str>) -> Result<&'static ModelConfig> {
        let id = model_id.unwrap_or(DEFAULT_MODEL_ID);
        MODELS
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::UnknownModel { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_exposes_id_and_name() {
        let registry = ModelRegistry::new();
        let models = registry.list();
        assert!(!models.is_empty());
        assert!(models.iter().any(|m| m.id == "tinybert"));
    }

    #[test]
    fn test_resolve_default() {
        let registry = ModelRegistry::new();
        let model = registry.resolve(None).unwrap();
        assert_eq!(model.id, "distilbert");
    }

    #[test]
    fn test_resolve_known_id() {
        let registry = ModelRegistry::new();
        let model = registry.resolve(Some("roberta-base")).unwrap();
        assert_eq!(model.model, "deepset/roberta-base-squad2");
    }

    #[test]
    fn test_resolve_unknown_id() {
        let registry = ModelRegistry::new();
        let err = registry.resolve(Some("gpt-9")).unwrap_err();
        assert!(matches!(err, AppError::UnknownModel { .. }));
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = ModelRegistry::new();
        let models = registry.list();
        let mut ids: Vec<_> = models.iter().map(|m| m.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), models.len());
    }

    #[test]
    fn test_default_is_in_catalog() {
        let registry = ModelRegistry::new();
        assert!(registry.resolve(Some(registry.default_id())).is_ok());
    }
}
