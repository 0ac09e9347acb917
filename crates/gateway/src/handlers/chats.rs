//! Chat management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use docchat_common::{
    db::models::Chat,
    db::{ChatDetail, Repository},
    errors::{AppError, Result},
};

/// Create chat request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateChatRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
}

/// Create chat response
#[derive(Serialize)]
pub struct CreateChatResponse {
    pub id: String,
}

/// Update chat request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateChatRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
}

#[derive(Serialize)]
pub struct UpdateChatResponse {
    pub id: String,
}

/// Create a new chat
pub async fn create_chat(
    State(state): State<AppState>,
    request: Option<Json<CreateChatRequest>>,
) -> Result<(StatusCode, Json<CreateChatResponse>)> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
    })?;

    let repo = Repository::new(state.db.clone());
    let chat = repo.create_chat(request.title).await?;

    tracing::info!(chat_id = %chat.id, "Chat created");

    Ok((StatusCode::CREATED, Json(CreateChatResponse { id: chat.id })))
}

/// List chats sorted by most recent activity
pub async fn list_chats(State(state): State<AppState>) -> Result<Json<Vec<Chat>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.list_chats().await?))
}

/// Get a chat with its documents and messages
pub async fn get_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatDetail>> {
    let repo = Repository::new(state.db.clone());
    let detail = repo
        .chat_detail(&chat_id)
        .await?
        .ok_or(AppError::ChatNotFound { id: chat_id })?;
    Ok(Json(detail))
}

/// Update a chat's title. A missing title is a no-op.
pub async fn update_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<UpdateChatRequest>,
) -> Result<Json<UpdateChatResponse>> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
    })?;

    if let Some(title) = request.title {
        let repo = Repository::new(state.db.clone());
        repo.update_chat_title(&chat_id, &title).await?;
    }

    Ok(Json(UpdateChatResponse { id: chat_id }))
}
