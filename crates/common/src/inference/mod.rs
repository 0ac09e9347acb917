//! Hugging Face Inference API client
//!
//! Provides a unified client for the hosted inference tasks DocChat uses:
//! - Extractive question answering ([`QaBackend`])
//! - Token classification for NER ([`NerBackend`])
//! - Image-to-text OCR ([`OcrBackend`])
//!
//! The client normalizes the backend's dual response shapes (single object
//! or array of candidates) into one canonical `Vec<QaCandidate>` at this
//! boundary, so the answering engine never deals with shape ambiguity.

use crate::config::InferenceConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Fixed windowing parameters for long contexts: the backend splits context
/// into overlapping windows of `max_seq_len` tokens with `doc_stride` overlap
/// when the input exceeds the model's token budget.
pub const MAX_SEQ_LEN: u32 = 384;
pub const DOC_STRIDE: u32 = 128;

/// A single extractive QA request
#[derive(Debug, Clone)]
pub struct QaRequest {
    pub question: String,
    pub context: String,
    /// Backend model identifier (not the registry id)
    pub model: String,
    pub max_seq_len: u32,
    pub doc_stride: u32,
    /// Allow the backend to signal "no answer found" instead of forcing a
    /// low-confidence span
    pub handle_impossible_answer: bool,
}

impl QaRequest {
    pub fn new(question: impl Into<String>, context: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: context.into(),
            model: model.into(),
            max_seq_len: MAX_SEQ_LEN,
            doc_stride: DOC_STRIDE,
            handle_impossible_answer: true,
        }
    }
}

/// A ranked answer candidate from the QA backend
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct QaCandidate {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub score: f32,
}

/// An aggregated entity span from the token-classification backend
#[derive(Debug, Clone, Deserialize)]
pub struct EntitySpan {
    pub entity_group: String,
    pub word: String,
    #[serde(default)]
    pub score: f32,
}

/// Trait for extractive question answering
#[async_trait]
pub trait QaBackend: Send + Sync {
    /// Answer `request.question` against `request.context`, returning ranked
    /// candidates (best first, possibly empty)
    async fn question_answering(&self, request: &QaRequest) -> Result<Vec<QaCandidate>>;
}

/// Trait for named-entity token classification
#[async_trait]
pub trait NerBackend: Send + Sync {
    /// Return aggregated entity spans for `text`
    async fn token_classification(&self, text: &str) -> Result<Vec<EntitySpan>>;
}

/// Trait for image OCR
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Return the text recognized in an image
    async fn image_to_text(&self, image: &[u8]) -> Result<String>;
}

#[derive(Serialize)]
struct QaPayload<'a> {
    inputs: QaInputs<'a>,
    parameters: QaParameters,
}

#[derive(Serialize)]
struct QaInputs<'a> {
    question: &'a str,
    context: &'a str,
}

#[derive(Serialize)]
struct QaParameters {
    max_seq_len: u32,
    doc_stride: u32,
    handle_impossible_answer: bool,
}

#[derive(Serialize)]
struct NerPayload<'a> {
    inputs: &'a str,
    parameters: NerParameters,
}

#[derive(Serialize)]
struct NerParameters {
    aggregation_strategy: &'static str,
}

#[derive(Deserialize)]
struct GeneratedText {
    #[serde(default)]
    generated_text: String,
}

/// Hugging Face Inference API client
///
/// Stateless per call; a single instance is shared across concurrent requests.
pub struct HfInferenceClient {
    client: reqwest::Client,
    api_base: String,
    token: String,
    ner_model: String,
    ocr_model: String,
}

impl HfInferenceClient {
    /// Create a new client from configuration.
    ///
    /// Fails with a configuration error when the token is absent or blank,
    /// so a misconfigured deployment dies at startup instead of silently
    /// serving degraded answers.
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "inference token is required. Set APP__INFERENCE__TOKEN or HF_TOKEN."
                    .to_string(),
            })?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
            ner_model: config.ner_model.clone(),
            ocr_model: config.ocr_model.clone(),
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.api_base, model)
    }

    /// Map a non-success upstream status to the error taxonomy: 503/504 are
    /// transient (retryable), everything else is fatal.
    fn classify_status(status: StatusCode, body: &str) -> AppError {
        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::GATEWAY_TIMEOUT {
            AppError::InferenceUnavailable {
                status: status.as_u16(),
            }
        } else {
            AppError::InferenceFailed {
                message: format!("API error {}: {}", status, body),
            }
        }
    }

    async fn post_json<T: Serialize>(&self, model: &str, payload: &T) -> Result<Value> {
        let response = self
            .client
            .post(self.model_url(model))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::InferenceFailed {
                message: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        response.json().await.map_err(|e| AppError::InferenceFailed {
            message: format!("failed to parse response: {}", e),
        })
    }
}

/// Normalize the backend's dual response shape into ranked candidates.
/// Anything that is neither an object nor an array yields no candidates.
fn candidates_from_value(value: Value) -> Vec<QaCandidate> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Value::Object(_) => serde_json::from_value(value).map(|c| vec![c]).unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl QaBackend for HfInferenceClient {
    async fn question_answering(&self, request: &QaRequest) -> Result<Vec<QaCandidate>> {
        let payload = QaPayload {
            inputs: QaInputs {
                question: &request.question,
                context: &request.context,
            },
            parameters: QaParameters {
                max_seq_len: request.max_seq_len,
                doc_stride: request.doc_stride,
                handle_impossible_answer: request.handle_impossible_answer,
            },
        };

        let value = self.post_json(&request.model, &payload).await?;
        let candidates = candidates_from_value(value);

        debug!(
            model = %request.model,
            candidates = candidates.len(),
            "question answering response"
        );

        Ok(candidates)
    }
}

#[async_trait]
impl NerBackend for HfInferenceClient {
    async fn token_classification(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let payload = NerPayload {
            inputs: text,
            parameters: NerParameters {
                aggregation_strategy: "simple",
            },
        };

        let value = self.post_json(&self.ner_model, &payload).await?;
        serde_json::from_value(value).map_err(|e| AppError::InferenceFailed {
            message: format!("failed to parse entity spans: {}", e),
        })
    }
}

#[async_trait]
impl OcrBackend for HfInferenceClient {
    async fn image_to_text(&self, image: &[u8]) -> Result<String> {
        let response = self
            .client
            .post(self.model_url(&self.ocr_model))
            .bearer_auth(&self.token)
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| AppError::InferenceFailed {
                message: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let results: Vec<GeneratedText> =
            response.json().await.map_err(|e| AppError::InferenceFailed {
                message: format!("failed to parse OCR response: {}", e),
            })?;

        Ok(results
            .into_iter()
            .map(|r| r.generated_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
