//! Database layer for DocChat
//!
//! Provides:
//! - SeaORM entity models over SQLite
//! - Repository pattern for data access
//! - Connection management and schema initialization

pub mod models;
mod repository;

pub use repository::{ChatDetail, NewDocument, Repository};

use crate::config::DatabaseConfig;
use crate::errors::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Idempotent schema, matching the original chats/documents/messages layout
const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    title TEXT
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    chat_id TEXT NOT NULL,
    source_type TEXT NOT NULL,
    source_path_or_url TEXT NOT NULL,
    display_name TEXT NOT NULL,
    extracted_text TEXT NOT NULL,
    entities TEXT,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    FOREIGN KEY (chat_id) REFERENCES chats(id)
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    chat_id TEXT NOT NULL,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    model_used TEXT NOT NULL,
    inference_time REAL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (chat_id) REFERENCES chats(id)
);

CREATE INDEX IF NOT EXISTS idx_documents_chat_id ON documents(chat_id);
CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id);
"#;

/// Database connection wrapper
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect and create the schema if it does not exist
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        ensure_data_dir(&config.url);

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts).await?;

        for statement in INIT_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            conn.execute_unprepared(statement).await?;
        }

        info!(url = %config.url, "database ready");

        Ok(Self { conn })
    }

    /// The underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn.ping().await?;
        Ok(())
    }
}

/// Create the parent directory for a file-backed database (local dev).
/// In-memory databases need no directory.
fn ensure_data_dir(url: &str) {
    let path = url.trim_start_matches("sqlite://");
    if path.starts_with(":memory:") || path.contains("mode=memory") {
        return;
    }
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}
