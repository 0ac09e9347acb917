//! Model catalog endpoint

use axum::{extract::State, Json};

use crate::AppState;
use docchat_common::qa::ModelSummary;

/// List the QA models available for the dropdown (id and display name only)
pub async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelSummary>> {
    Json(state.engine.registry().list())
}
