//! WebSocket upgrade handler and per-connection event loop.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use crate::error::RelayError;
use crate::AppState;

use super::events::ServerEvent;
use super::lifecycle;
use super::registry::OutboundReceiver;

/// Close codes.
const CLOSE_GOING_AWAY: u16 = 1001;
const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, ws_rx) = socket.split();

    let (connection_id, outbound) = match lifecycle::on_connect(&state.registry) {
        Ok(opened) => opened,
        Err(err) => {
            tracing::debug!(%err, "refusing connection");
            let _ = send_close(&mut ws_tx, CLOSE_TRY_AGAIN_LATER, "Server shutting down").await;
            return;
        }
    };

    run_connection(&state, &connection_id, ws_tx, ws_rx, outbound).await;

    lifecycle::on_disconnect(&state.registry, &connection_id);
}

/// Read client events and drain the outbound queue until either side closes.
///
/// Client events are handled one at a time, so a client never has more than
/// one event in flight.
async fn run_connection(
    state: &AppState,
    connection_id: &str,
    mut ws_tx: WsSink,
    mut ws_rx: WsStream,
    mut outbound: OutboundReceiver,
) {
    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err((event, err)) = state.dispatcher.handle_text(connection_id, &text).await {
                            if report_error(&mut ws_tx, connection_id, event.as_deref(), &err).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let err = RelayError::BadPayload("binary frames are not supported".to_string());
                        if report_error(&mut ws_tx, connection_id, None, &err).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, %connection_id, "ws read error");
                        break;
                    }
                }
            }

            event = outbound.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut ws_tx, &event).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        // The registry dropped our queue: process shutdown.
                        let _ = send_close(&mut ws_tx, CLOSE_GOING_AWAY, "Server shutting down").await;
                        break;
                    }
                }
            }
        }
    }
}

/// Errors are written straight to the socket, bypassing the outbound queue,
/// so a full queue cannot swallow them.
async fn report_error(
    ws_tx: &mut WsSink,
    connection_id: &str,
    event: Option<&str>,
    err: &RelayError,
) -> Result<(), axum::Error> {
    tracing::debug!(%connection_id, event, code = err.code(), %err, "event rejected");
    send_event(ws_tx, &ServerEvent::error(err, event)).await
}

async fn send_event(ws_tx: &mut WsSink, event: &ServerEvent) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(%err, event = event.name(), "failed to encode server event");
            return Ok(());
        }
    };
    ws_tx.send(Message::Text(json.into())).await
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
