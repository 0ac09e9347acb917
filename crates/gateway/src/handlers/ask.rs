//! Question answering handler

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use docchat_common::{
    db::Repository,
    errors::{AppError, Result},
    qa::{ContextInput, ConversationTurn, HISTORY_LIMIT},
};

/// Ask request
#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
    pub model_id: Option<String>,
    /// Restrict context to these documents. When absent, all enabled
    /// documents in the chat are used.
    pub document_ids: Option<Vec<String>>,
}

/// Ask response
#[derive(Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub model_used: String,
    pub inference_time: f64,
}

/// Answer a question against a chat's documents.
///
/// Stores the exchange as a message and, for the first question in an
/// untitled chat, derives the chat title from the question text.
pub async fn ask(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: format!("invalid ask request: {}", e),
    })?;

    let repo = Repository::new(state.db.clone());
    let chat = repo
        .find_chat(&chat_id)
        .await?
        .ok_or(AppError::ChatNotFound {
            id: chat_id.clone(),
        })?;

    // Reject unknown model ids before touching documents or the backend.
    state
        .engine
        .registry()
        .resolve(request.model_id.as_deref())?;

    let documents = repo
        .get_documents(
            &chat_id,
            request.document_ids.is_none(),
            request.document_ids.as_deref(),
        )
        .await?;
    if documents.is_empty() {
        return Err(AppError::NoDocuments);
    }

    let texts: Vec<String> = documents
        .into_iter()
        .map(|d| d.extracted_text)
        .filter(|t| !t.trim().is_empty())
        .collect();

    let history: Vec<ConversationTurn> = repo
        .recent_messages(&chat_id, HISTORY_LIMIT)
        .await?
        .into_iter()
        .map(|m| ConversationTurn::new(m.question, m.answer))
        .collect();
    let first_exchange = history.is_empty();

    let result = state
        .engine
        .answer_with_history(
            &request.question,
            ContextInput::from(texts),
            &history,
            request.model_id.as_deref(),
        )
        .await?;

    let seconds = result.inference_time.as_secs_f64();
    metrics::counter!("docchat_asks_total", "model" => result.model_used.clone()).increment(1);
    metrics::histogram!("docchat_inference_duration_seconds").record(seconds);

    repo.add_message(
        &chat_id,
        &request.question,
        &result.answer,
        &result.model_used,
        Some(seconds),
    )
    .await?;

    if first_exchange && chat.title.is_none() {
        let title = derive_title(&request.question);
        if !title.is_empty() {
            repo.update_chat_title(&chat_id, &title).await?;
        }
    }

    Ok(Json(AskResponse {
        answer: result.answer,
        model_used: result.model_used,
        inference_time: seconds,
    }))
}

/// Derive a chat title from the first question: up to five words, capped at
/// fifty characters.
fn derive_title(question: &str) -> String {
    let words: Vec<&str> = question.split_whitespace().take(5).collect();
    words.join(" ").chars().take(50).collect()
}
