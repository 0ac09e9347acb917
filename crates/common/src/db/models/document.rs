//! Document entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub chat_id: String,

    /// "file" or "url"
    pub source_type: String,

    pub source_path_or_url: String,

    pub display_name: String,

    pub extracted_text: String,

    /// JSON map of entity label -> entity list, filled by the NER background
    /// task after ingestion
    pub entities: Option<String>,

    /// Disabled documents are excluded from the default ask context
    pub enabled: bool,

    /// RFC 3339 UTC timestamp
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chat::Entity",
        from = "Column::ChatId",
        to = "super::chat::Column::Id"
    )]
    Chat,
}

impl Related<super::chat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
