use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Serialize, Serializer};
use utoipa::ToSchema;

use crate::store::schema::chat_messages;

/// A persisted chat message between one patient and one provider.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = chat_messages)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Snowflake id, serialized as a string so browsers keep full precision.
    #[serde(serialize_with = "id_as_string")]
    #[schema(value_type = String)]
    pub id: i64,
    pub room: String,
    pub message: String,
    /// Free-form role label, normally `patient` or `provider`.
    pub sender: String,
    pub patient_id: String,
    pub provider_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessage {
    pub id: i64,
    pub room: String,
    pub message: String,
    pub sender: String,
    pub patient_id: String,
    pub provider_id: String,
    pub timestamp: DateTime<Utc>,
}

impl From<NewChatMessage> for ChatMessage {
    fn from(new: NewChatMessage) -> Self {
        Self {
            id: new.id,
            room: new.room,
            message: new.message,
            sender: new.sender,
            patient_id: new.patient_id,
            provider_id: new.provider_id,
            timestamp: new.timestamp,
        }
    }
}

fn id_as_string<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}
