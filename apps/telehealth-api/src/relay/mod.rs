//! Real-time relay: room membership, chat fanout and WebRTC signaling.

pub mod chat;
pub mod dispatch;
pub mod events;
pub mod lifecycle;
pub mod registry;
pub mod room;
pub mod server;
pub mod signaling;
