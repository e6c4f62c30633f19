use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::models::message::{ChatMessage, NewChatMessage};

use super::{MessageStore, StoreError};

/// In-process message store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryStore {
    rooms: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored messages across all rooms.
    pub fn len(&self) -> usize {
        self.rooms.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        let stored = ChatMessage::from(message);
        self.rooms
            .lock()
            .entry(stored.room.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn conversation(&self, room: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let mut messages = self.rooms.lock().get(room).cloned().unwrap_or_default();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(messages)
    }
}
