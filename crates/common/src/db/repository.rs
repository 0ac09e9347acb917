//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations over chats,
//! documents, and messages.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::ner::EntityMap;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

/// A chat together with its documents and messages
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatDetail {
    #[serde(flatten)]
    pub chat: Chat,
    pub documents: Vec<Document>,
    pub messages: Vec<Message>,
}

/// Input for storing an extracted document
#[derive(Debug, Clone)]
pub struct NewDocument {
    /// "file" or "url"
    pub source_type: String,
    pub source_path_or_url: String,
    pub display_name: String,
    pub extracted_text: String,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Chat Operations
    // ========================================================================

    /// Create a new chat
    pub async fn create_chat(&self, title: Option<String>) -> Result<Chat> {
        let ts = now();
        let chat = ChatActiveModel {
            id: Set(new_id()),
            created_at: Set(ts.clone()),
            updated_at: Set(ts),
            title: Set(title),
        };
        Ok(chat.insert(self.conn()).await?)
    }

    /// Find chat by id
    pub async fn find_chat(&self, id: &str) -> Result<Option<Chat>> {
        ChatEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// List chats sorted by most recent activity first
    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        ChatEntity::find()
            .order_by_desc(ChatColumn::UpdatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Update a chat's title. Errors when the chat does not exist.
    pub async fn update_chat_title(&self, id: &str, title: &str) -> Result<()> {
        let result = ChatEntity::update_many()
            .col_expr(ChatColumn::Title, Expr::value(title.to_string()))
            .col_expr(ChatColumn::UpdatedAt, Expr::value(now()))
            .filter(ChatColumn::Id.eq(id))
            .exec(self.conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::ChatNotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Fetch a chat together with its documents and messages
    pub async fn chat_detail(&self, id: &str) -> Result<Option<ChatDetail>> {
        let Some(chat) = self.find_chat(id).await? else {
            return Ok(None);
        };
        let documents = self.get_documents(id, false, None).await?;
        let messages = self.list_messages(id).await?;
        Ok(Some(ChatDetail {
            chat,
            documents,
            messages,
        }))
    }

    async fn touch_chat(&self, id: &str) -> Result<()> {
        ChatEntity::update_many()
            .col_expr(ChatColumn::UpdatedAt, Expr::value(now()))
            .filter(ChatColumn::Id.eq(id))
            .exec(self.conn())
            .await?;
        Ok(())
    }

    // ========================================================================
    // Document Operations
    // ========================================================================

    /// Store an extracted document and bump the chat's activity timestamp
    pub async fn add_document(&self, chat_id: &str, input: NewDocument) -> Result<Document> {
        let document = DocumentActiveModel {
            id: Set(new_id()),
            chat_id: Set(chat_id.to_string()),
            source_type: Set(input.source_type),
            source_path_or_url: Set(input.source_path_or_url),
            display_name: Set(input.display_name),
            extracted_text: Set(input.extracted_text),
            entities: Set(None),
            enabled: Set(true),
            created_at: Set(now()),
        };
        let document = document.insert(self.conn()).await?;
        self.touch_chat(chat_id).await?;
        Ok(document)
    }

    /// Fetch documents for a chat, optionally restricted to enabled ones or
    /// to an explicit id list
    pub async fn get_documents(
        &self,
        chat_id: &str,
        enabled_only: bool,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<Document>> {
        let mut query = DocumentEntity::find().filter(DocumentColumn::ChatId.eq(chat_id));
        if let Some(ids) = document_ids {
            query = query.filter(DocumentColumn::Id.is_in(ids.iter().cloned()));
        } else if enabled_only {
            query = query.filter(DocumentColumn::Enabled.eq(true));
        }
        query
            .order_by_asc(DocumentColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Toggle a document's enabled state. Errors when the document does not
    /// exist in this chat.
    pub async fn set_document_enabled(
        &self,
        chat_id: &str,
        document_id: &str,
        enabled: bool,
    ) -> Result<()> {
        let result = DocumentEntity::update_many()
            .col_expr(DocumentColumn::Enabled, Expr::value(enabled))
            .filter(DocumentColumn::ChatId.eq(chat_id))
            .filter(DocumentColumn::Id.eq(document_id))
            .exec(self.conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::DocumentNotFound {
                id: document_id.to_string(),
            });
        }
        Ok(())
    }

    /// Attach extracted entities to a document (NER background task)
    pub async fn set_document_entities(
        &self,
        chat_id: &str,
        document_id: &str,
        entities: &EntityMap,
    ) -> Result<()> {
        let json = serde_json::to_string(entities)?;
        let result = DocumentEntity::update_many()
            .col_expr(DocumentColumn::Entities, Expr::value(json))
            .filter(DocumentColumn::ChatId.eq(chat_id))
            .filter(DocumentColumn::Id.eq(document_id))
            .exec(self.conn())
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::DocumentNotFound {
                id: document_id.to_string(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Message Operations
    // ========================================================================

    /// Record a question/answer turn and bump the chat's activity timestamp
    pub async fn add_message(
        &self,
        chat_id: &str,
        question: &str,
        answer: &str,
        model_used: &str,
        inference_time: Option<f64>,
    ) -> Result<Message> {
        let message = MessageActiveModel {
            id: Set(new_id()),
            chat_id: Set(chat_id.to_string()),
            question: Set(question.to_string()),
            answer: Set(answer.to_string()),
            model_used: Set(model_used.to_string()),
            inference_time: Set(inference_time),
            created_at: Set(now()),
        };
        let message = message.insert(self.conn()).await?;
        self.touch_chat(chat_id).await?;
        Ok(message)
    }

    /// All messages for a chat, oldest first
    pub async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        MessageEntity::find()
            .filter(MessageColumn::ChatId.eq(chat_id))
            .order_by_asc(MessageColumn::CreatedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// The most recent `limit` messages for a chat, returned oldest first
    /// (the window the QA engine folds into context)
    pub async fn recent_messages(&self, chat_id: &str, limit: u64) -> Result<Vec<Message>> {
        let mut messages = MessageEntity::find()
            .filter(MessageColumn::ChatId.eq(chat_id))
            .order_by_desc(MessageColumn::CreatedAt)
            .limit(limit)
            .all(self.conn())
            .await?;
        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    async fn repo() -> Repository {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            // A pooled in-memory SQLite gives every connection its own
            // database; a single connection keeps the schema visible.
            max_connections: 1,
            connect_timeout_secs: 5,
        };
        let pool = DbPool::new(&config).await.expect("in-memory database");
        Repository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_find_chat() {
        let repo = repo().await;
        let chat = repo.create_chat(Some("Contracts".into())).await.unwrap();
        let found = repo.find_chat(&chat.id).await.unwrap().unwrap();
        assert_eq!(found.title.as_deref(), Some("Contracts"));
    }

    #[tokio::test]
    async fn test_list_chats_recent_first() {
        let repo = repo().await;
        let first = repo.create_chat(None).await.unwrap();
        let second = repo.create_chat(None).await.unwrap();
        // Touch the first chat so it becomes the most recent
        repo.update_chat_title(&first.id, "bumped").await.unwrap();
        let chats = repo.list_chats().await.unwrap();
        assert_eq!(chats[0].id, first.id);
        assert_eq!(chats[1].id, second.id);
    }

    #[tokio::test]
    async fn test_update_title_unknown_chat() {
        let repo = repo().await;
        let err = repo.update_chat_title("missing", "t").await.unwrap_err();
        assert!(matches!(err, AppError::ChatNotFound { .. }));
    }

    fn doc(text: &str) -> NewDocument {
        NewDocument {
            source_type: "file".into(),
            source_path_or_url: "report.pdf".into(),
            display_name: "report.pdf".into(),
            extracted_text: text.into(),
        }
    }

    #[tokio::test]
    async fn test_documents_enabled_filter() {
        let repo = repo().await;
        let chat = repo.create_chat(None).await.unwrap();
        let kept = repo.add_document(&chat.id, doc("kept")).await.unwrap();
        let disabled = repo.add_document(&chat.id, doc("disabled")).await.unwrap();
        repo.set_document_enabled(&chat.id, &disabled.id, false)
            .await
            .unwrap();

        let enabled = repo.get_documents(&chat.id, true, None).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, kept.id);

        let all = repo.get_documents(&chat.id, false, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_documents_id_filter() {
        let repo = repo().await;
        let chat = repo.create_chat(None).await.unwrap();
        let a = repo.add_document(&chat.id, doc("a")).await.unwrap();
        let _b = repo.add_document(&chat.id, doc("b")).await.unwrap();

        let selected = repo
            .get_documents(&chat.id, false, Some(&[a.id.clone()]))
            .await
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].extracted_text, "a");
    }

    #[tokio::test]
    async fn test_set_enabled_unknown_document() {
        let repo = repo().await;
        let chat = repo.create_chat(None).await.unwrap();
        let err = repo
            .set_document_enabled(&chat.id, "missing", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_document_entities() {
        let repo = repo().await;
        let chat = repo.create_chat(None).await.unwrap();
        let stored = repo.add_document(&chat.id, doc("Curie in Paris")).await.unwrap();

        let mut entities = EntityMap::new();
        entities.insert("PER".into(), vec!["Curie".into()]);
        repo.set_document_entities(&chat.id, &stored.id, &entities)
            .await
            .unwrap();

        let docs = repo.get_documents(&chat.id, false, None).await.unwrap();
        let json = docs[0].entities.as_deref().unwrap();
        assert!(json.contains("Curie"));
    }

    #[tokio::test]
    async fn test_recent_messages_window() {
        let repo = repo().await;
        let chat = repo.create_chat(None).await.unwrap();
        for i in 0..7 {
            repo.add_message(&chat.id, &format!("q{}", i), &format!("a{}", i), "distilbert", None)
                .await
                .unwrap();
        }
        let recent = repo.recent_messages(&chat.id, 5).await.unwrap();
        assert_eq!(recent.len(), 5);
        // Oldest-first window over the most recent five
        assert_eq!(recent[0].question, "q2");
        assert_eq!(recent[4].question, "q6");
    }

    #[tokio::test]
    async fn test_message_records_inference_time() {
        let repo = repo().await;
        let chat = repo.create_chat(None).await.unwrap();
        let message = repo
            .add_message(&chat.id, "q", "a", "tinybert", Some(1.25))
            .await
            .unwrap();
        assert_eq!(message.inference_time, Some(1.25));
        assert_eq!(message.model_used, "tinybert");
    }

    #[tokio::test]
    async fn test_chat_detail_includes_children() {
        let repo = repo().await;
        let chat = repo.create_chat(Some("t".into())).await.unwrap();
        repo.add_document(&chat.id, doc("text")).await.unwrap();
        repo.add_message(&chat.id, "q", "a", "distilbert", None)
            .await
            .unwrap();

        let detail = repo.chat_detail(&chat.id).await.unwrap().unwrap();
        assert_eq!(detail.documents.len(), 1);
        assert_eq!(detail.messages.len(), 1);
        assert!(repo.chat_detail("missing").await.unwrap().is_none());
    }
}
