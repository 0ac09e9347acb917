//! Health, readiness, and metrics endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;
use docchat_common::{db::Repository, errors::Result};

/// Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": docchat_common::VERSION }))
}

/// Readiness probe: verifies database connectivity
pub async fn ready(State(state): State<AppState>) -> Result<Json<Value>> {
    let repo = Repository::new(state.db.clone());
    repo.ping().await?;
    Ok(Json(json!({ "status": "ready" })))
}

/// Prometheus metrics in text exposition format
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
