//! SeaORM entity models
//!
//! Database entities for DocChat: chats, their documents, and their messages.

mod chat;
mod document;
mod message;

pub use chat::{
    ActiveModel as ChatActiveModel, Column as ChatColumn, Entity as ChatEntity, Model as Chat,
};

pub use document::{
    ActiveModel as DocumentActiveModel, Column as DocumentColumn, Entity as DocumentEntity,
    Model as Document,
};

pub use message::{
    ActiveModel as MessageActiveModel, Column as MessageColumn, Entity as MessageEntity,
    Model as Message,
};
