//! Canonical room keys.
//!
//! Both the HTTP history route and the relays derive keys through this module,
//! so a patient and a provider always land in the same conversation room no
//! matter which side computes it.

use std::fmt;

use crate::error::RelayError;

/// Separator between the two participant ids of a conversation room.
///
/// Participant ids may not contain it, otherwise `("a-b", "c")` and
/// `("a", "b-c")` would share the key `a-b-c`.
pub const CONVERSATION_DELIMITER: char = '-';

/// Identifier of a broadcast group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomKey(String);

impl RoomKey {
    /// Conversation room for a patient/provider pair. Commutative.
    pub fn conversation(a: &str, b: &str) -> Result<Self, RelayError> {
        require_participant("patientId", a)?;
        require_participant("providerId", b)?;

        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Ok(Self(format!("{first}{CONVERSATION_DELIMITER}{second}")))
    }

    /// Video room for an appointment: the appointment id verbatim.
    pub fn video(appointment_id: &str) -> Result<Self, RelayError> {
        require("appointmentId", appointment_id)?;
        Ok(Self(appointment_id.to_string()))
    }

    /// A key supplied directly by a client.
    pub fn from_raw(room: &str) -> Result<Self, RelayError> {
        require("room", room)?;
        Ok(Self(room.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn conversation_room(a: &str, b: &str) -> Result<RoomKey, RelayError> {
    RoomKey::conversation(a, b)
}

pub fn video_room(appointment_id: &str) -> Result<RoomKey, RelayError> {
    RoomKey::video(appointment_id)
}

fn require(field: &str, value: &str) -> Result<(), RelayError> {
    if value.trim().is_empty() {
        return Err(RelayError::invalid(format!("{field} is required")));
    }
    Ok(())
}

fn require_participant(field: &str, value: &str) -> Result<(), RelayError> {
    require(field, value)?;
    if value.contains(CONVERSATION_DELIMITER) {
        return Err(RelayError::invalid(format!(
            "{field} must not contain `{CONVERSATION_DELIMITER}`"
        )));
    }
    Ok(())
}
