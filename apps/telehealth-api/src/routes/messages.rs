//! Chat history endpoint.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::ApiError;
use crate::models::message::ChatMessage;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/conversation", get(conversation))
}

// ---------------------------------------------------------------------------
// GET /api/messages/conversation?patientId&providerId
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ConversationParams {
    pub patient_id: Option<String>,
    pub provider_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/messages/conversation",
    tag = "Messages",
    params(ConversationParams),
    responses(
        (status = 200, description = "Messages oldest first", body = [ChatMessage]),
        (status = 400, description = "Missing participant id", body = crate::error::ApiErrorBody),
    )
)]
pub async fn conversation(
    State(state): State<AppState>,
    Query(params): Query<ConversationParams>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let messages = state
        .chat
        .fetch_conversation(
            params.patient_id.as_deref().unwrap_or_default(),
            params.provider_id.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(messages))
}
