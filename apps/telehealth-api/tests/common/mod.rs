#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use telehealth_api::config::Config;
use telehealth_api::models::message::{ChatMessage, NewChatMessage};
use telehealth_api::relay::room::RoomKey;
use telehealth_api::store::{MemoryStore, MessageStore, StoreError};
use telehealth_api::AppState;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build a test AppState backed by the in-memory message store.
pub fn test_state() -> AppState {
    state_with_store(Arc::new(MemoryStore::new()))
}

pub fn state_with_store(store: Arc<dyn MessageStore>) -> AppState {
    AppState::new(Config::default(), store)
}

/// Build the full application router wired to the test state.
pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = telehealth_api::routes::router().with_state(state.clone());
    (app, state)
}

/// A store that is always unreachable.
pub struct UnreachableStore;

#[async_trait]
impl MessageStore for UnreachableStore {
    async fn append(&self, _message: NewChatMessage) -> Result<ChatMessage, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn conversation(&self, _room: &str) -> Result<Vec<ChatMessage>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Start an actual TCP server for WebSocket testing. The server runs in the background.
pub async fn start_ws_server(state: AppState) -> SocketAddr {
    let app = telehealth_api::routes::router().with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

pub async fn connect(addr: SocketAddr) -> Client {
    let url = format!("ws://{addr}/ws");
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");
    ws_stream
}

pub async fn emit(client: &mut Client, event: &str, data: Value) {
    let frame = serde_json::json!({ "event": event, "data": data });
    client
        .send(tungstenite::Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

/// Next JSON event, skipping control frames.
pub async fn next_event(client: &mut Client) -> Value {
    loop {
        let msg = time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timeout waiting for event")
            .expect("stream ended")
            .expect("ws read error");

        match msg {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(&text).expect("parse event");
            }
            tungstenite::Message::Close(frame) => panic!("connection closed: {frame:?}"),
            _ => continue,
        }
    }
}

/// Assert nothing arrives within a short window.
pub async fn expect_silence(client: &mut Client) {
    if let Ok(Some(Ok(msg))) = time::timeout(Duration::from_millis(200), client.next()).await {
        panic!("expected no event, got {msg:?}");
    }
}

/// Wait until the registry shows `count` members in `room`.
pub async fn wait_for_members(state: &AppState, room: &RoomKey, count: usize) {
    for _ in 0..100 {
        if state.registry.members_of(room).len() == count {
            return;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "room {room} never reached {count} members (has {})",
        state.registry.members_of(room).len()
    );
}

pub async fn wait_for_connections(state: &AppState, count: usize) {
    for _ in 0..100 {
        if state.registry.connection_count() == count {
            return;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "registry never reached {count} connections (has {})",
        state.registry.connection_count()
    );
}
