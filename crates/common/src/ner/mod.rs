//! Named-entity extraction over the inference backend
//!
//! Long documents are split at word boundaries into ~2000 character chunks
//! (roughly 512 tokens), classified per chunk with the same bounded
//! retry/backoff policy the QA engine uses, and the spans merged into one
//! deduplicated map grouped by entity label.
//!
//! NER runs as a background task after document ingestion; callers log
//! failures and move on rather than failing the upload.

use crate::errors::Result;
use crate::inference::NerBackend;
use crate::qa::{MAX_RETRIES, RETRY_BACKOFF_BASE};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, warn};

/// Chunk size in characters (~512 tokens at 4 chars/token)
const CHUNK_SIZE: usize = 2000;

/// Entity labels kept in the output
pub const ENTITY_LABELS: &[&str] = &["PER", "ORG", "LOC", "MISC"];

/// Extracted entities grouped by label, each list deduplicated and sorted
pub type EntityMap = BTreeMap<String, Vec<String>>;

/// Split text into chunks of roughly `chunk_size` characters, preferring to
/// break at a word boundary. Blank chunks are dropped.
fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        if end < text.len() {
            // Walk back to the last space inside the window, if any
            if let Some(pos) = bytes[start..end].iter().rposition(|&b| b == b' ') {
                if pos > 0 {
                    end = start + pos + 1;
                }
            } else {
                // No space in the window; extend to a char boundary instead
                while end < text.len() && !text.is_char_boundary(end) {
                    end += 1;
                }
            }
            while !text.is_char_boundary(end) {
                end += 1;
            }
        }
        let chunk = text[start..end].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        start = end;
    }
    chunks
}

/// Extract named entities from `text`, grouped by label.
///
/// Empty input yields an empty map without touching the backend. Transient
/// upstream failures are retried per chunk with the shared backoff policy;
/// any terminal failure aborts the whole extraction.
pub async fn extract_entities(backend: &dyn NerBackend, text: &str) -> Result<EntityMap> {
    let chunks = chunk_text(text, CHUNK_SIZE);
    if chunks.is_empty() {
        return Ok(EntityMap::new());
    }

    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for chunk in &chunks {
        let mut attempt: u32 = 0;
        let spans = loop {
            match backend.token_classification(chunk).await {
                Ok(spans) => break spans,
                Err(err) if err.is_transient() && attempt < MAX_RETRIES - 1 => {
                    let wait = Duration::from_secs(RETRY_BACKOFF_BASE.pow(attempt));
                    warn!(
                        attempt = attempt + 1,
                        wait_s = wait.as_secs(),
                        error = %err,
                        "ner_retry"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(error = %err, "ner_failed");
                    return Err(err);
                }
            }
        };

        for span in spans {
            let label = span.entity_group.trim().to_uppercase();
            if !ENTITY_LABELS.contains(&label.as_str()) {
                continue;
            }
            let word = span.word.trim();
            if word.is_empty() {
                continue;
            }
            let entries = grouped.entry(label).or_default();
            if !entries.iter().any(|e| e.eq_ignore_ascii_case(word)) {
                entries.push(word.to_string());
            }
        }
    }

    for entries in grouped.values_mut() {
        entries.sort();
    }

    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use crate::inference::EntitySpan;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockNer {
        spans: Vec<EntitySpan>,
        transient_failures: usize,
        calls: AtomicUsize,
    }

    impl MockNer {
        fn with_spans(spans: Vec<(&str, &str)>) -> Self {
            Self {
                spans: spans
                    .into_iter()
                    .map(|(group, word)| EntitySpan {
                        entity_group: group.to_string(),
                        word: word.to_string(),
                        score: 0.99,
                    })
                    .collect(),
                transient_failures: 0,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NerBackend for MockNer {
        async fn token_classification(&self, _text: &str) -> Result<Vec<EntitySpan>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.transient_failures {
                return Err(AppError::InferenceUnavailable { status: 503 });
            }
            Ok(self.spans.clone())
        }
    }

    #[test]
    fn test_chunk_short_text() {
        assert_eq!(chunk_text("hello world", 2000), vec!["hello world"]);
    }

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk_text("", 2000).is_empty());
        assert!(chunk_text("   ", 2000).is_empty());
    }

    #[test]
    fn test_chunk_breaks_at_word_boundary() {
        let text = "alpha beta gamma delta";
        let chunks = chunk_text(text, 12);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(!chunk.starts_with(' '));
            assert!(!chunk.ends_with(' '));
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[tokio::test]
    async fn test_extract_entities_groups_and_dedupes() {
        let backend = MockNer::with_spans(vec![
            ("PER", "Marie Curie"),
            ("LOC", "Paris"),
            ("PER", "marie curie"),
            ("ORG", "Sorbonne"),
        ]);
        let entities = extract_entities(&backend, "Marie Curie taught in Paris.")
            .await
            .unwrap();
        assert_eq!(entities["PER"], vec!["Marie Curie"]);
        assert_eq!(entities["LOC"], vec!["Paris"]);
        assert_eq!(entities["ORG"], vec!["Sorbonne"]);
    }

    #[tokio::test]
    async fn test_extract_entities_skips_unknown_labels() {
        let backend = MockNer::with_spans(vec![("DATE", "1903"), ("PER", "Curie")]);
        let entities = extract_entities(&backend, "Curie won in 1903.").await.unwrap();
        assert!(!entities.contains_key("DATE"));
        assert!(entities.contains_key("PER"));
    }

    #[tokio::test]
    async fn test_extract_entities_empty_text_skips_backend() {
        let backend = MockNer::with_spans(vec![]);
        let entities = extract_entities(&backend, "   ").await.unwrap();
        assert!(entities.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_entities_retries_transient() {
        let backend = MockNer {
            transient_failures: 1,
            ..MockNer::with_spans(vec![("PER", "Curie")])
        };
        let entities = extract_entities(&backend, "Curie.").await.unwrap();
        assert_eq!(entities["PER"], vec!["Curie"]);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }
}
