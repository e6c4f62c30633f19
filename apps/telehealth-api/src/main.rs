use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telehealth_api::config::Config;
use telehealth_api::relay::lifecycle;
use telehealth_api::store::{pool, MemoryStore, MessageStore, PgMessageStore};
use telehealth_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let store: Arc<dyn MessageStore> = match config.database_url.as_deref() {
        Some(url) => {
            let db = pool::connect(url).expect("failed to build connection pool");
            Arc::new(PgMessageStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, chat history is kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let cors = telehealth_api::routes::cors_layer(&config);
    let state = AppState::new(config, store);
    let registry = state.registry.clone();

    let app = Router::new()
        .merge(telehealth_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "telehealth-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            lifecycle::shutdown_signal().await;
            let closed = registry.shutdown();
            tracing::info!(closed, "relay shut down");
        })
        .await
        .expect("server error");
}
