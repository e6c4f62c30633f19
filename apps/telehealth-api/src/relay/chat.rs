//! Chat relay: persist a message, then fan it out to the whole room.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use telehealth_common::SnowflakeGenerator;
use tokio::sync::Mutex;

use crate::error::RelayError;
use crate::models::message::{ChatMessage, NewChatMessage};
use crate::store::MessageStore;

use super::events::{resolve_message_room, ReceivedMessage, SendMessagePayload, ServerEvent};
use super::registry::ConnectionRegistry;
use super::room::RoomKey;

pub struct ChatRelay {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn MessageStore>,
    ids: Arc<SnowflakeGenerator>,
    /// Serializes store-then-broadcast per room so live order matches stored order.
    room_locks: DashMap<RoomKey, Arc<Mutex<()>>>,
}

impl ChatRelay {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn MessageStore>,
        ids: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            registry,
            store,
            ids,
            room_locks: DashMap::new(),
        }
    }

    pub fn handle_join_room(
        &self,
        connection_id: &str,
        patient_id: &str,
        provider_id: &str,
    ) -> Result<RoomKey, RelayError> {
        let room = RoomKey::conversation(patient_id, provider_id)?;
        if self.registry.join(connection_id, &room) {
            tracing::info!(%connection_id, %room, "joined conversation room");
        }
        Ok(room)
    }

    pub fn handle_leave_room(
        &self,
        connection_id: &str,
        patient_id: &str,
        provider_id: &str,
    ) -> Result<RoomKey, RelayError> {
        let room = RoomKey::conversation(patient_id, provider_id)?;
        if self.registry.leave(connection_id, &room) {
            tracing::info!(%connection_id, %room, "left conversation room");
        }
        Ok(room)
    }

    /// Store the message, then deliver `receiveMessage` to every member of the
    /// room, the sender included. Nothing is delivered if the store fails.
    ///
    /// The id and timestamp are assigned under the room lock, so history order
    /// is delivery order.
    pub async fn handle_send_message(
        &self,
        connection_id: &str,
        payload: SendMessagePayload,
    ) -> Result<ChatMessage, RelayError> {
        let room = resolve_message_room(&payload)?;

        let lock = self
            .room_locks
            .entry(room.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.store_and_broadcast(connection_id, room.clone(), payload).await
        };
        drop(lock);
        self.room_locks
            .remove_if(&room, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn store_and_broadcast(
        &self,
        connection_id: &str,
        room: RoomKey,
        payload: SendMessagePayload,
    ) -> Result<ChatMessage, RelayError> {
        let new = NewChatMessage {
            id: self.ids.generate(),
            room: room.as_str().to_string(),
            message: payload.message,
            sender: payload.sender,
            patient_id: payload.patient_id.unwrap_or_default(),
            provider_id: payload.provider_id.unwrap_or_default(),
            timestamp: Utc::now(),
        };

        let stored = self.store.append(new).await.map_err(|err| {
            tracing::warn!(%connection_id, %room, %err, "failed to store chat message");
            RelayError::from(err)
        })?;

        let delivered = self.registry.broadcast(
            &room,
            ServerEvent::ReceiveMessage(ReceivedMessage::from(&stored)),
            None,
        );
        tracing::debug!(%connection_id, %room, message_id = stored.id, delivered, "chat message relayed");

        Ok(stored)
    }

    /// Stored history of a patient/provider conversation, oldest first.
    pub async fn fetch_conversation(
        &self,
        patient_id: &str,
        provider_id: &str,
    ) -> Result<Vec<ChatMessage>, RelayError> {
        let room = RoomKey::conversation(patient_id, provider_id)?;
        Ok(self.store.conversation(room.as_str()).await?)
    }
}
