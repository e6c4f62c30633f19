//! Event dispatch table.
//!
//! Each client event name maps to a handler taking the relay context, the
//! originating connection id and the raw `data` payload. Handlers never touch
//! the socket; replies travel through the connection registry.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RelayError;

use super::chat::ChatRelay;
use super::events::{ClientFrame, EventName, RoomPayload, RoomTarget, SendMessagePayload, SignalPayload};
use super::registry::ConnectionRegistry;
use super::signaling::SignalingRelay;

/// Everything a handler may act on.
pub struct RelayContext {
    pub registry: Arc<ConnectionRegistry>,
    pub chat: Arc<ChatRelay>,
    pub signaling: SignalingRelay,
}

pub type Handler =
    for<'a> fn(&'a RelayContext, &'a str, Value) -> BoxFuture<'a, Result<(), RelayError>>;

pub struct Dispatcher {
    ctx: RelayContext,
    handlers: HashMap<&'static str, Handler>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, chat: Arc<ChatRelay>) -> Self {
        let signaling = SignalingRelay::new(registry.clone());
        let mut handlers: HashMap<&'static str, Handler> = HashMap::new();
        handlers.insert(EventName::JOIN_ROOM, join_room);
        handlers.insert(EventName::JOIN_ROOM_DASHED, join_room);
        handlers.insert(EventName::JOIN_VIDEO_ROOM, join_video_room);
        handlers.insert(EventName::LEAVE_ROOM, leave_room);
        handlers.insert(EventName::LEAVE_VIDEO_ROOM, leave_video_room);
        handlers.insert(EventName::SEND_MESSAGE, send_message);
        handlers.insert(EventName::SIGNAL, signal);

        Self {
            ctx: RelayContext {
                registry,
                chat,
                signaling,
            },
            handlers,
        }
    }

    /// Parse a text frame and run its handler.
    ///
    /// On error the name of the offending event is returned alongside, when
    /// the frame got far enough to have one.
    pub async fn handle_text(
        &self,
        connection_id: &str,
        text: &str,
    ) -> Result<(), (Option<String>, RelayError)> {
        let frame: ClientFrame = serde_json::from_str(text)
            .map_err(|err| (None, RelayError::BadPayload(err.to_string())))?;
        let event = frame.event.clone();
        self.dispatch(connection_id, frame)
            .await
            .map_err(|err| (Some(event), err))
    }

    pub async fn dispatch(&self, connection_id: &str, frame: ClientFrame) -> Result<(), RelayError> {
        let handler = self
            .handlers
            .get(frame.event.as_str())
            .ok_or_else(|| RelayError::UnknownEvent(frame.event.clone()))?;
        tracing::trace!(%connection_id, event = %frame.event, "dispatching event");
        handler(&self.ctx, connection_id, frame.data).await
    }

    pub fn has_handler(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    pub fn context(&self) -> &RelayContext {
        &self.ctx
    }
}

fn parse<T: DeserializeOwned>(data: Value) -> Result<T, RelayError> {
    serde_json::from_value(data).map_err(|err| RelayError::BadPayload(err.to_string()))
}

fn join_room<'a>(ctx: &'a RelayContext, connection_id: &'a str, data: Value) -> BoxFuture<'a, Result<(), RelayError>> {
    async move {
        match parse::<RoomPayload>(data)?.target()? {
            RoomTarget::Conversation {
                patient_id,
                provider_id,
            } => ctx.chat.handle_join_room(connection_id, &patient_id, &provider_id)?,
            RoomTarget::Video { appointment_id } => ctx
                .signaling
                .handle_join_video_room(connection_id, &appointment_id)?,
        };
        Ok(())
    }
    .boxed()
}

fn join_video_room<'a>(ctx: &'a RelayContext, connection_id: &'a str, data: Value) -> BoxFuture<'a, Result<(), RelayError>> {
    async move {
        let payload: RoomPayload = parse(data)?;
        let appointment_id = payload.appointment_id.unwrap_or_default();
        ctx.signaling
            .handle_join_video_room(connection_id, &appointment_id)?;
        Ok(())
    }
    .boxed()
}

fn leave_room<'a>(ctx: &'a RelayContext, connection_id: &'a str, data: Value) -> BoxFuture<'a, Result<(), RelayError>> {
    async move {
        match parse::<RoomPayload>(data)?.target()? {
            RoomTarget::Conversation {
                patient_id,
                provider_id,
            } => ctx.chat.handle_leave_room(connection_id, &patient_id, &provider_id)?,
            RoomTarget::Video { appointment_id } => ctx
                .signaling
                .handle_leave_video_room(connection_id, &appointment_id)?,
        };
        Ok(())
    }
    .boxed()
}

fn leave_video_room<'a>(ctx: &'a RelayContext, connection_id: &'a str, data: Value) -> BoxFuture<'a, Result<(), RelayError>> {
    async move {
        let payload: RoomPayload = parse(data)?;
        let appointment_id = payload.appointment_id.unwrap_or_default();
        ctx.signaling
            .handle_leave_video_room(connection_id, &appointment_id)?;
        Ok(())
    }
    .boxed()
}

fn send_message<'a>(ctx: &'a RelayContext, connection_id: &'a str, data: Value) -> BoxFuture<'a, Result<(), RelayError>> {
    async move {
        let payload: SendMessagePayload = parse(data)?;
        ctx.chat.handle_send_message(connection_id, payload).await?;
        Ok(())
    }
    .boxed()
}

fn signal<'a>(ctx: &'a RelayContext, connection_id: &'a str, data: Value) -> BoxFuture<'a, Result<(), RelayError>> {
    async move {
        let payload: SignalPayload = parse(data)?;
        ctx.signaling
            .handle_signal(connection_id, &payload.appointment_id, payload.data)?;
        Ok(())
    }
    .boxed()
}
