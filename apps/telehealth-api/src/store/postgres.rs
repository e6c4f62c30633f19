use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::PoolError;

use crate::models::message::{ChatMessage, NewChatMessage};

use super::pool::DbPool;
use super::schema::chat_messages;
use super::{MessageStore, StoreError};

/// PostgreSQL-backed chat history.
pub struct PgMessageStore {
    pool: DbPool,
}

impl PgMessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Query(err.to_string())
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(&self, message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        let mut conn = self.pool.get().await?;

        let stored: ChatMessage = diesel_async::RunQueryDsl::get_result(
            diesel::insert_into(chat_messages::table)
                .values(&message)
                .returning(ChatMessage::as_returning()),
            &mut conn,
        )
        .await?;

        Ok(stored)
    }

    async fn conversation(&self, room: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let mut conn = self.pool.get().await?;

        let messages: Vec<ChatMessage> = diesel_async::RunQueryDsl::load(
            chat_messages::table
                .filter(chat_messages::room.eq(room))
                .order((chat_messages::timestamp.asc(), chat_messages::id.asc()))
                .select(ChatMessage::as_select()),
            &mut conn,
        )
        .await?;

        Ok(messages)
    }
}
