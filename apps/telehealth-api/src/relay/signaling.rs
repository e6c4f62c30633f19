//! WebRTC signaling relay.
//!
//! Offers, answers and ICE candidates are routed to the other participants of
//! an appointment's video room. Payloads are never stored, inspected beyond
//! their `type` tag for logging, or echoed back to the sender.

use std::sync::Arc;

use serde_json::Value;

use crate::error::RelayError;

use super::events::ServerEvent;
use super::registry::ConnectionRegistry;
use super::room::RoomKey;

#[derive(Clone)]
pub struct SignalingRelay {
    registry: Arc<ConnectionRegistry>,
}

impl SignalingRelay {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn handle_join_video_room(
        &self,
        connection_id: &str,
        appointment_id: &str,
    ) -> Result<RoomKey, RelayError> {
        let room = RoomKey::video(appointment_id)?;
        if self.registry.join(connection_id, &room) {
            tracing::info!(%connection_id, %room, "joined video room");
        }
        Ok(room)
    }

    pub fn handle_leave_video_room(
        &self,
        connection_id: &str,
        appointment_id: &str,
    ) -> Result<RoomKey, RelayError> {
        let room = RoomKey::video(appointment_id)?;
        if self.registry.leave(connection_id, &room) {
            tracing::info!(%connection_id, %room, "left video room");
        }
        Ok(room)
    }

    /// Forward `payload` unchanged to everyone in the video room but the sender.
    /// Returns how many peers it was queued for.
    pub fn handle_signal(
        &self,
        connection_id: &str,
        appointment_id: &str,
        payload: Value,
    ) -> Result<usize, RelayError> {
        let room = RoomKey::video(appointment_id)?;
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let delivered = self
            .registry
            .broadcast(&room, ServerEvent::Signal(payload), Some(connection_id));
        tracing::debug!(%connection_id, %room, kind = %kind, delivered, "signal relayed");

        Ok(delivered)
    }
}
