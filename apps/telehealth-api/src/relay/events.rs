//! Event names and wire-format messages.
//!
//! Every frame is a JSON text message shaped `{"event": <name>, "data": <payload>}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;
use crate::models::message::ChatMessage;

use super::room::RoomKey;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub struct EventName;

impl EventName {
    pub const JOIN_ROOM: &'static str = "joinRoom";
    pub const JOIN_ROOM_DASHED: &'static str = "join-room";
    pub const JOIN_VIDEO_ROOM: &'static str = "join-video-room";
    pub const LEAVE_ROOM: &'static str = "leaveRoom";
    pub const LEAVE_VIDEO_ROOM: &'static str = "leave-video-room";
    pub const SEND_MESSAGE: &'static str = "sendMessage";
    pub const SIGNAL: &'static str = "signal";
    pub const RECEIVE_MESSAGE: &'static str = "receiveMessage";
    pub const ERROR: &'static str = "error";
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Envelope of every frame received from a client.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Payload of the join/leave events.
///
/// Chat clients send the two participant ids; video clients send only the
/// appointment id, sometimes under the same `joinRoom` name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub appointment_id: Option<String>,
}

/// Which kind of room a [`RoomPayload`] addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomTarget {
    Conversation {
        patient_id: String,
        provider_id: String,
    },
    Video {
        appointment_id: String,
    },
}

impl RoomPayload {
    pub fn target(self) -> Result<RoomTarget, RelayError> {
        match self {
            Self {
                patient_id: None,
                provider_id: None,
                appointment_id: Some(appointment_id),
            } => Ok(RoomTarget::Video { appointment_id }),
            Self {
                patient_id: None,
                provider_id: None,
                appointment_id: None,
            } => Err(RelayError::invalid(
                "expected patientId and providerId, or appointmentId",
            )),
            Self {
                patient_id,
                provider_id,
                ..
            } => Ok(RoomTarget::Conversation {
                patient_id: patient_id.unwrap_or_default(),
                provider_id: provider_id.unwrap_or_default(),
            }),
        }
    }
}

/// Payload of `sendMessage`.
///
/// The stored timestamp is always server time; a `timestamp` sent by the
/// client is ignored so it cannot reorder history.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    /// Room key as computed by the client. Derived from the ids when absent.
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
}

/// Payload of `signal`. `data` is relayed untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPayload {
    #[serde(default)]
    pub appointment_id: String,
    #[serde(default)]
    pub data: Value,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "receiveMessage")]
    ReceiveMessage(ReceivedMessage),
    #[serde(rename = "signal")]
    Signal(Value),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

/// Chat message as delivered to room members.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub message: String,
    pub sender: String,
    pub patient_id: String,
    pub provider_id: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatMessage> for ReceivedMessage {
    fn from(m: &ChatMessage) -> Self {
        Self {
            message: m.message.clone(),
            sender: m.sender.clone(),
            patient_id: m.patient_id.clone(),
            provider_id: m.provider_id.clone(),
            timestamp: m.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    /// Name of the client event that failed, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl ServerEvent {
    pub fn error(err: &RelayError, event: Option<&str>) -> Self {
        Self::Error(ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
            event: event.map(str::to_string),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReceiveMessage(_) => EventName::RECEIVE_MESSAGE,
            Self::Signal(_) => EventName::SIGNAL,
            Self::Error(_) => EventName::ERROR,
        }
    }
}

/// Room a `sendMessage` targets.
///
/// An explicit `room` must agree with the key derived from the participant
/// ids when both are present.
pub fn resolve_message_room(payload: &SendMessagePayload) -> Result<RoomKey, RelayError> {
    let derived = match (payload.patient_id.as_deref(), payload.provider_id.as_deref()) {
        (Some(p), Some(q)) if !p.trim().is_empty() && !q.trim().is_empty() => {
            Some(RoomKey::conversation(p, q)?)
        }
        _ => None,
    };
    let explicit = payload
        .room
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(RoomKey::from_raw)
        .transpose()?;

    match (explicit, derived) {
        (Some(explicit), Some(derived)) if explicit != derived => Err(RelayError::invalid(format!(
            "room `{explicit}` does not match participants (expected `{derived}`)"
        ))),
        (Some(room), _) | (None, Some(room)) => Ok(room),
        (None, None) => Err(RelayError::invalid(
            "sendMessage requires room or patientId and providerId",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_frame_defaults_missing_data_to_null() {
        let frame: ClientFrame = serde_json::from_str(r#"{"event":"joinRoom"}"#).unwrap();
        assert_eq!(frame.event, "joinRoom");
        assert!(frame.data.is_null());
    }

    #[test]
    fn room_payload_with_only_appointment_targets_video() {
        let payload: RoomPayload = serde_json::from_value(json!({ "appointmentId": "appt-42" })).unwrap();
        assert_eq!(
            payload.target().unwrap(),
            RoomTarget::Video { appointment_id: "appt-42".into() }
        );
    }

    #[test]
    fn room_payload_with_participants_targets_conversation() {
        let payload: RoomPayload =
            serde_json::from_value(json!({ "patientId": "p1", "providerId": "pr1" })).unwrap();
        assert_eq!(
            payload.target().unwrap(),
            RoomTarget::Conversation { patient_id: "p1".into(), provider_id: "pr1".into() }
        );
    }

    #[test]
    fn empty_room_payload_is_invalid() {
        assert!(matches!(RoomPayload::default().target(), Err(RelayError::InvalidArgument(_))));
    }

    #[test]
    fn receive_message_wire_shape() {
        let event = ServerEvent::ReceiveMessage(ReceivedMessage {
            message: "hi".into(),
            sender: "patient".into(),
            patient_id: "p1".into(),
            provider_id: "pr1".into(),
            timestamp: "2025-03-01T10:00:00Z".parse().unwrap(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "receiveMessage");
        assert_eq!(value["data"]["message"], "hi");
        assert_eq!(value["data"]["patientId"], "p1");
        assert_eq!(value["data"]["providerId"], "pr1");
        assert!(value["data"]["timestamp"].is_string());
    }

    #[test]
    fn signal_event_forwards_raw_data() {
        let data = json!({ "type": "offer", "offer": { "sdp": "v=0", "type": "offer" } });
        let value = serde_json::to_value(ServerEvent::Signal(data.clone())).unwrap();
        assert_eq!(value, json!({ "event": "signal", "data": data }));
    }

    #[test]
    fn message_room_is_derived_from_participants() {
        let payload = SendMessagePayload {
            patient_id: Some("pr1".into()),
            provider_id: Some("p1".into()),
            ..Default::default()
        };
        assert_eq!(resolve_message_room(&payload).unwrap().as_str(), "p1-pr1");
    }

    #[test]
    fn explicit_room_must_match_participants() {
        let payload = SendMessagePayload {
            room: Some("p1-other".into()),
            patient_id: Some("p1".into()),
            provider_id: Some("pr1".into()),
            ..Default::default()
        };
        assert!(matches!(resolve_message_room(&payload), Err(RelayError::InvalidArgument(_))));

        let payload = SendMessagePayload {
            room: Some("p1-pr1".into()),
            ..payload
        };
        assert_eq!(resolve_message_room(&payload).unwrap().as_str(), "p1-pr1");
    }

    #[test]
    fn explicit_room_alone_is_used_verbatim() {
        let payload = SendMessagePayload {
            room: Some("pat_1-prv_9".into()),
            message: "hi".into(),
            ..Default::default()
        };
        assert_eq!(resolve_message_room(&payload).unwrap().as_str(), "pat_1-prv_9");
    }

    #[test]
    fn client_timestamp_is_not_part_of_the_payload() {
        let payload: SendMessagePayload = serde_json::from_value(json!({
            "message": "hi",
            "patientId": "p1",
            "providerId": "pr1",
            "timestamp": "2001-01-01T00:00:00Z",
        }))
        .unwrap();
        assert_eq!(payload.message, "hi");
    }

    #[test]
    fn message_without_room_or_participants_is_invalid() {
        let payload = SendMessagePayload {
            message: "hi".into(),
            ..Default::default()
        };
        assert!(matches!(resolve_message_room(&payload), Err(RelayError::InvalidArgument(_))));
    }
}
