use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Live real-time connections.
    pub connections: usize,
    /// Rooms with at least one member.
    pub rooms: usize,
}

async fn banner() -> &'static str {
    "Telehealth relay is running"
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.registry.is_shut_down() { "shutting_down" } else { "ok" };
    Json(HealthResponse {
        status: status.to_string(),
        connections: state.registry.connection_count(),
        rooms: state.registry.room_count(),
    })
}
