//! Context normalization and history folding
//!
//! Pure functions: deterministic, no side effects.

/// Marker separating document context from the folded conversation history
pub const HISTORY_MARKER: &str = "\n\n---\nPrevious Q&A:\n";

/// Context handed to the answering engine: either one pre-assembled string
/// or the ordered texts of several documents.
#[derive(Debug, Clone)]
pub enum ContextInput {
    Text(String),
    Documents(Vec<String>),
}

impl From<String> for ContextInput {
    fn from(text: String) -> Self {
        ContextInput::Text(text)
    }
}

impl From<&str> for ContextInput {
    fn from(text: &str) -> Self {
        ContextInput::Text(text.to_string())
    }
}

impl From<Vec<String>> for ContextInput {
    fn from(documents: Vec<String>) -> Self {
        ContextInput::Documents(documents)
    }
}

/// One prior question/answer pair from the chat history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Collapse the context input into a single string.
///
/// A single string is trimmed and returned as-is (possibly empty). A document
/// sequence drops empty/whitespace-only elements, trims the survivors, and
/// joins them with a blank line, preserving input order.
pub fn normalize(context: &ContextInput) -> String {
    match context {
        ContextInput::Text(text) => text.trim().to_string(),
        ContextInput::Documents(documents) => documents
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Append the conversation history to the base context behind the
/// `Previous Q&A:` marker. With no history the base passes through untouched.
pub fn fold_history(base: &str, history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return base.to_string();
    }
    let rendered = history
        .iter()
        .map(|turn| format!("Q: {}\nA: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}{}{}", base, HISTORY_MARKER, rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_single_string() {
        assert_eq!(normalize(&"  hello  ".into()), "hello");
    }

    #[test]
    fn test_normalize_empty_string() {
        assert_eq!(normalize(&"".into()), "");
        assert_eq!(normalize(&"   \n\t ".into()), "");
    }

    #[test]
    fn test_normalize_joins_documents() {
        let input = ContextInput::Documents(vec!["doc1".into(), "doc2".into()]);
        assert_eq!(normalize(&input), "doc1\n\ndoc2");
    }

    #[test]
    fn test_normalize_drops_blank_documents() {
        let input = ContextInput::Documents(vec!["  a  ".into(), "".into(), "  b  ".into()]);
        assert_eq!(normalize(&input), "a\n\nb");
    }

    #[test]
    fn test_normalize_all_blank_documents() {
        let input = ContextInput::Documents(vec!["".into(), "  ".into()]);
        assert_eq!(normalize(&input), "");
    }

    #[test]
    fn test_normalize_empty_document_list() {
        assert_eq!(normalize(&ContextInput::Documents(vec![])), "");
    }

    #[test]
    fn test_fold_history_renders_turns() {
        let history = vec![ConversationTurn::new("What country?", "France")];
        let folded = fold_history("France is a country.", &history);
        assert!(folded.contains("Previous Q&A:"));
        assert!(folded.contains("Q: What country?"));
        assert!(folded.contains("A: France"));
        assert!(folded.starts_with("France is a country."));
    }

    #[test]
    fn test_fold_history_empty_passthrough() {
        assert_eq!(fold_history("context", &[]), "context");
    }

    #[test]
    fn test_fold_history_joins_multiple_turns() {
        let history = vec![
            ConversationTurn::new("q1", "a1"),
            ConversationTurn::new("q2", "a2"),
        ];
        let folded = fold_history("base", &history);
        assert!(folded.contains("Q: q1\nA: a1\nQ: q2\nA: a2"));
    }
}
