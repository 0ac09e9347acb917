//! Answering engine: orchestration and retry discipline
//!
//! Drives one extractive QA call end to end: normalize context, fold in
//! history, short-circuit on empty context, resolve the model, invoke the
//! backend with bounded exponential backoff on transient failures, and
//! extract the final answer string.

use super::context::{self, ContextInput, ConversationTurn};
use super::models::ModelRegistry;
use crate::errors::Result;
use crate::inference::{QaBackend, QaRequest};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Sentinel answer returned when there is no context or no extracted span
pub const EMPTY_CONTEXT_FALLBACK: &str = "No context provided.";

/// Total attempts per call (1 initial + 2 retries)
pub const MAX_RETRIES: u32 = 3;

/// Base for the exponential backoff, in seconds (waits: 1s, 2s)
pub const RETRY_BACKOFF_BASE: u64 = 2;

/// Result of one answering call
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub answer: String,
    /// The resolved registry model id
    pub model_used: String,
    pub inference_time: Duration,
}

/// The answering orchestrator.
///
/// Holds no per-call state; concurrent calls share the backend handle and
/// the read-only registry without coordination. Each call's backoff sleep is
/// scoped to that call alone.
pub struct AnsweringEngine {
    backend: Arc<dyn QaBackend>,
    registry: ModelRegistry,
}

impl AnsweringEngine {
    /// Create an engine over an injected backend. The caller owns the
    /// backend's lifetime; tests substitute a mock here.
    pub fn new(backend: Arc<dyn QaBackend>, registry: ModelRegistry) -> Self {
        Self { backend, registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Single-turn convenience wrapper: no history, default model.
    pub async fn answer(&self, question: &str, context: ContextInput) -> Result<AnswerResult> {
        self.answer_with_history(question, context, &[], None).await
    }

    /// Answer a question against document context and the last N Q/A pairs.
    ///
    /// History is folded in before the emptiness check, so non-empty history
    /// alone keeps the call alive even when no document text was supplied.
    pub async fn answer_with_history(
        &self,
        question: &str,
        context: ContextInput,
        history: &[ConversationTurn],
        model_id: Option<&str>,
    ) -> Result<AnswerResult> {
        let started = Instant::now();

        let base = context::normalize(&context);
        let combined = context::fold_history(&base, history);

        if combined.trim().is_empty() {
            // Deliberate short-circuit: nothing to answer from, so skip the
            // cost and latency of a backend call entirely.
            debug!("empty context, returning fallback without inference");
            return Ok(AnswerResult {
                answer: EMPTY_CONTEXT_FALLBACK.to_string(),
                model_used: model_id.unwrap_or(self.registry.default_id()).to_string(),
                inference_time: started.elapsed(),
            });
        }

        let model = self.registry.resolve(model_id)?;

        info!(
            model_id = model.id,
            model = model.model,
            context_len = combined.len(),
            question_len = question.len(),
            "inference_start"
        );

        let request = QaRequest::new(question, combined, model.model);

        let mut attempt: u32 = 0;
        let candidates = loop {
            match self.backend.question_answering(&request).await {
                Ok(candidates) => break candidates,
                Err(err) if err.is_transient() && attempt < MAX_RETRIES - 1 => {
                    let wait = Duration::from_secs(RETRY_BACKOFF_BASE.pow(attempt));
                    metrics::counter!("docchat_inference_retries_total").increment(1);
                    warn!(
                        model_id = model.id,
                        attempt = attempt + 1,
                        wait_s = wait.as_secs(),
                        error = %err,
                        "inference_retry"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    metrics::counter!("docchat_inference_failures_total").increment(1);
                    error!(model_id = model.id, error = %err, "inference_failed");
                    return Err(err);
                }
            }
        };

        let answer = candidates
            .first()
            .map(|c| c.answer.trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| EMPTY_CONTEXT_FALLBACK.to_string());

        info!(model_id = model.id, answer_len = answer.len(), "inference_done");

        Ok(AnswerResult {
            answer,
            model_used: model.id.to_string(),
            inference_time: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::inference::QaCandidate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock backend: fails the first `transient_failures` calls with a 503,
    /// then serves the scripted candidates. Records every request it sees.
    struct MockBackend {
        candidates: Vec<QaCandidate>,
        transient_failures: usize,
        calls: AtomicUsize,
        last_context: Mutex<Option<String>>,
    }

    impl MockBackend {
        fn answering(answer: &str) -> Self {
            Self {
                candidates: vec![QaCandidate {
                    answer: answer.to_string(),
                    score: 0.9,
                }],
                transient_failures: 0,
                calls: AtomicUsize::new(0),
                last_context: Mutex::new(None),
            }
        }

        fn empty() -> Self {
            Self {
                candidates: Vec::new(),
                transient_failures: 0,
                calls: AtomicUsize::new(0),
                last_context: Mutex::new(None),
            }
        }

        fn flaky(answer: &str, transient_failures: usize) -> Self {
            Self {
                transient_failures,
                ..Self::answering(answer)
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QaBackend for MockBackend {
        async fn question_answering(&self, request: &QaRequest) -> Result<Vec<QaCandidate>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_context.lock().unwrap() = Some(request.context.clone());
            if call < self.transient_failures {
                return Err(AppError::InferenceUnavailable { status: 503 });
            }
            Ok(self.candidates.clone())
        }
    }

    fn engine(backend: Arc<MockBackend>) -> AnsweringEngine {
        AnsweringEngine::new(backend, ModelRegistry::new())
    }

    #[tokio::test]
    async fn test_empty_string_context_skips_backend() {
        let backend = Arc::new(MockBackend::answering("never"));
        let result = engine(backend.clone())
            .answer("What?", "".into())
            .await
            .unwrap();
        assert_eq!(result.answer, EMPTY_CONTEXT_FALLBACK);
        assert_eq!(result.model_used, "distilbert");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_context_skips_backend() {
        let backend = Arc::new(MockBackend::answering("never"));
        let result = engine(backend.clone())
            .answer("What?", "  \n\t ".into())
            .await
            .unwrap();
        assert_eq!(result.answer, EMPTY_CONTEXT_FALLBACK);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_document_list_skips_backend() {
        let backend = Arc::new(MockBackend::answering("never"));
        let result = engine(backend.clone())
            .answer("What?", ContextInput::Documents(vec![]))
            .await
            .unwrap();
        assert_eq!(result.answer, EMPTY_CONTEXT_FALLBACK);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_all_blank_documents_skip_backend() {
        let backend = Arc::new(MockBackend::answering("never"));
        let docs = ContextInput::Documents(vec!["".into(), "   ".into()]);
        let result = engine(backend.clone()).answer("What?", docs).await.unwrap();
        assert_eq!(result.answer, EMPTY_CONTEXT_FALLBACK);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_answer_extracts_first_candidate() {
        let backend = Arc::new(MockBackend::answering("March 15, 2025"));
        let result = engine(backend.clone())
            .answer(
                "When does the contract expire?",
                "The contract expires March 15.".into(),
            )
            .await
            .unwrap();
        assert_eq!(result.answer, "March 15, 2025");
        assert_eq!(result.model_used, "distilbert");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_history_folded_into_backend_context() {
        let backend = Arc::new(MockBackend::answering("Paris"));
        let history = vec![ConversationTurn::new("What country?", "France")];
        let result = engine(backend.clone())
            .answer_with_history(
                "What is its capital?",
                "France is a country.".into(),
                &history,
                Some("tinybert"),
            )
            .await
            .unwrap();
        assert_eq!(result.answer, "Paris");
        assert_eq!(result.model_used, "tinybert");

        let seen = backend.last_context.lock().unwrap().clone().unwrap();
        assert!(seen.contains("Previous Q&A:"));
        assert!(seen.contains("What country?"));
        assert!(seen.contains("France"));
    }

    #[tokio::test]
    async fn test_history_alone_reaches_backend() {
        // Pinned order of operations: history is folded before the emptiness
        // check, so a follow-up question with no documents still runs.
        let backend = Arc::new(MockBackend::answering("France"));
        let history = vec![ConversationTurn::new("What country?", "France")];
        let result = engine(backend.clone())
            .answer_with_history("Which one again?", "".into(), &history, None)
            .await
            .unwrap();
        assert_eq!(result.answer, "France");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retried_with_backoff() {
        let backend = Arc::new(MockBackend::flaky("recovered", 2));
        let started = tokio::time::Instant::now();
        let result = engine(backend.clone())
            .answer("What?", "Some context.".into())
            .await
            .unwrap();
        assert_eq!(result.answer, "recovered");
        assert_eq!(backend.call_count(), 3);
        // Backoff schedule: 1s after the first failure, 2s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_surfaces_error() {
        let backend = Arc::new(MockBackend::flaky("never", 5));
        let err = engine(backend.clone())
            .answer("What?", "Some context.".into())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        struct FatalBackend {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl QaBackend for FatalBackend {
            async fn question_answering(&self, _: &QaRequest) -> Result<Vec<QaCandidate>> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::InferenceFailed {
                    message: "bad request".into(),
                })
            }
        }

        let backend = Arc::new(FatalBackend {
            calls: AtomicUsize::new(0),
        });
        let eng = AnsweringEngine::new(backend.clone(), ModelRegistry::new());
        let err = eng.answer("What?", "Some context.".into()).await.unwrap_err();
        assert!(matches!(err, AppError::InferenceFailed { .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_model_errors_before_backend() {
        let backend = Arc::new(MockBackend::answering("never"));
        let err = engine(backend.clone())
            .answer_with_history("What?", "Some context.".into(), &[], Some("gpt-9"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownModel { .. }));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_candidates_fall_back() {
        let backend = Arc::new(MockBackend::empty());
        let result = engine(backend)
            .answer("What?", "Some context.".into())
            .await
            .unwrap();
        assert_eq!(result.answer, EMPTY_CONTEXT_FALLBACK);
    }

    #[tokio::test]
    async fn test_blank_answer_falls_back() {
        let backend = Arc::new(MockBackend::answering("   "));
        let result = engine(backend)
            .answer("What?", "Some context.".into())
            .await
            .unwrap();
        assert_eq!(result.answer, EMPTY_CONTEXT_FALLBACK);
    }
}
