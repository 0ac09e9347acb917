//! Document upload and URL ingestion handlers
//!
//! Both ingestion paths use a partial-success contract: every file or URL is
//! processed independently, and the response carries the stored document ids
//! next to a list of per-item failures.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use docchat_common::{
    db::{NewDocument, Repository},
    errors::{AppError, Result},
    extract::{self, url as url_ingest, ExtractError, FileKind},
    ner,
};

/// One item that failed ingestion
#[derive(Debug, Serialize)]
pub struct FailedItem {
    pub filename_or_url: String,
    pub error: String,
}

/// Response for upload and add-urls
#[derive(Serialize)]
pub struct IngestResponse {
    pub document_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<Vec<FailedItem>>,
}

/// Add URLs request
#[derive(Debug, Deserialize, Validate)]
pub struct AddUrlsRequest {
    #[validate(length(min = 1))]
    pub urls: Vec<String>,
}

/// Toggle document enabled request
#[derive(Debug, Deserialize)]
pub struct DocumentEnabledRequest {
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct DocumentEnabledResponse {
    pub id: String,
    pub enabled: bool,
}

async fn require_chat(repo: &Repository, chat_id: &str) -> Result<()> {
    repo.find_chat(chat_id)
        .await?
        .map(|_| ())
        .ok_or(AppError::ChatNotFound {
            id: chat_id.to_string(),
        })
}

/// Store an extracted document and kick off entity extraction in the
/// background. NER failures are logged, never surfaced to the uploader.
async fn store_document(
    state: &AppState,
    repo: &Repository,
    chat_id: &str,
    input: NewDocument,
) -> Result<String> {
    let text = input.extracted_text.clone();
    let document = repo.add_document(chat_id, input).await?;
    metrics::counter!("docchat_documents_ingested_total").increment(1);

    let inference = state.inference.clone();
    let repo = repo.clone();
    let chat_id = chat_id.to_string();
    let document_id = document.id.clone();
    tokio::spawn(async move {
        match ner::extract_entities(inference.as_ref(), &text).await {
            Ok(entities) => {
                if let Err(e) = repo
                    .set_document_entities(&chat_id, &document_id, &entities)
                    .await
                {
                    tracing::warn!(
                        chat_id = %chat_id,
                        document_id = %document_id,
                        error = %e,
                        "failed to store entities"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    chat_id = %chat_id,
                    document_id = %document_id,
                    error = %e,
                    "ner_background_failed"
                );
            }
        }
    });

    Ok(document.id)
}

/// Upload files to a chat. Partial success: returns document_ids and a
/// failed list.
pub async fn upload(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let repo = Repository::new(state.db.clone());
    require_chat(&repo, &chat_id).await?;

    let mut document_ids = Vec::new();
    let mut failed = Vec::new();
    let mut seen_files = 0usize;

    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::Validation {
        message: format!("invalid multipart request: {}", e),
    })? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            failed.push(FailedItem {
                filename_or_url: "(no filename)".to_string(),
                error: "File has no filename".to_string(),
            });
            continue;
        };
        seen_files += 1;

        let Some(kind) = FileKind::from_filename(&filename) else {
            let extension = filename
                .rsplit_once('.')
                .map(|(_, ext)| format!(".{}", ext))
                .unwrap_or_default();
            failed.push(FailedItem {
                filename_or_url: filename,
                error: ExtractError::UnsupportedFileType { extension }.to_string(),
            });
            continue;
        };

        let bytes = field.bytes().await.map_err(|e| AppError::Validation {
            message: format!("failed to read uploaded file: {}", e),
        })?;
        if bytes.is_empty() {
            continue;
        }
        if bytes.len() > state.config.upload.max_file_bytes {
            failed.push(FailedItem {
                filename_or_url: filename,
                error: ExtractError::TooLarge {
                    size: bytes.len(),
                    limit: state.config.upload.max_file_bytes,
                }
                .to_string(),
            });
            continue;
        }

        match extract::extract_text(kind, &bytes, state.inference.as_ref()).await {
            Ok(text) if !text.trim().is_empty() => {
                let input = NewDocument {
                    source_type: "file".to_string(),
                    source_path_or_url: filename.clone(),
                    display_name: filename,
                    extracted_text: text.trim().to_string(),
                };
                document_ids.push(store_document(&state, &repo, &chat_id, input).await?);
            }
            Ok(_) => {
                // Extracted nothing; skip silently like an empty file
            }
            Err(e) => {
                metrics::counter!("docchat_documents_failed_total").increment(1);
                failed.push(FailedItem {
                    filename_or_url: filename,
                    error: e.to_string(),
                });
            }
        }
    }

    if seen_files == 0 && failed.is_empty() {
        return Err(AppError::Validation {
            message: "No files provided".to_string(),
        });
    }

    Ok(Json(IngestResponse {
        document_ids,
        failed: (!failed.is_empty()).then_some(failed),
    }))
}

/// Add documents from URLs. Partial success, same contract as upload.
pub async fn add_urls(
    State(state): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<AddUrlsRequest>,
) -> Result<Json<IngestResponse>> {
    request.validate().map_err(|_| AppError::Validation {
        message: "No URLs provided".to_string(),
    })?;

    let repo = Repository::new(state.db.clone());
    require_chat(&repo, &chat_id).await?;

    let mut document_ids = Vec::new();
    let mut failed = Vec::new();

    for url in &request.urls {
        let outcome = ingest_url(&state, &repo, &chat_id, url).await;
        match outcome {
            Ok(Some(id)) => document_ids.push(id),
            Ok(None) => {}
            Err(e) => {
                metrics::counter!("docchat_documents_failed_total").increment(1);
                failed.push(FailedItem {
                    filename_or_url: url.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Json(IngestResponse {
        document_ids,
        failed: (!failed.is_empty()).then_some(failed),
    }))
}

/// Download, extract, and store one URL. `Ok(None)` means the document held
/// no extractable text and was skipped.
async fn ingest_url(
    state: &AppState,
    repo: &Repository,
    chat_id: &str,
    url: &str,
) -> Result<Option<String>> {
    let download =
        url_ingest::download(&state.http, url, state.config.upload.max_file_bytes).await?;

    let text = extract::extract_text(download.kind, &download.bytes, state.inference.as_ref())
        .await?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    let input = NewDocument {
        source_type: "url".to_string(),
        source_path_or_url: url.to_string(),
        display_name: download.display_name,
        extracted_text: text.trim().to_string(),
    };
    let id = store_document(state, repo, chat_id, input).await?;
    Ok(Some(id))
}

/// Toggle document enabled state
pub async fn update_document_enabled(
    State(state): State<AppState>,
    Path((chat_id, document_id)): Path<(String, String)>,
    Json(request): Json<DocumentEnabledRequest>,
) -> Result<Json<DocumentEnabledResponse>> {
    let repo = Repository::new(state.db.clone());
    repo.set_document_enabled(&chat_id, &document_id, request.enabled)
        .await?;
    Ok(Json(DocumentEnabledResponse {
        id: document_id,
        enabled: request.enabled,
    }))
}
