//! Request handlers for the DocChat gateway

pub mod ask;
pub mod chats;
pub mod documents;
pub mod health;
pub mod models;
