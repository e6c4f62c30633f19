//! Chat history persistence.
//!
//! The relay only ever appends messages and reads a room's history back in
//! timestamp order, so the adapter surface is two calls wide.

pub mod memory;
pub mod pool;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;

use crate::models::message::{ChatMessage, NewChatMessage};

pub use memory::MemoryStore;
pub use postgres::PgMessageStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store was reached but rejected the operation.
    #[error("store query failed: {0}")]
    Query(String),
}

/// Append-only chat message storage.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably record a message. Returns the stored row.
    async fn append(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError>;

    /// All messages of a room, ascending by timestamp then id.
    async fn conversation(&self, room: &str) -> Result<Vec<ChatMessage>, StoreError>;
}
