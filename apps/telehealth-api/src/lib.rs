pub mod config;
pub mod error;
pub mod models;
pub mod relay;
pub mod routes;
pub mod store;

use std::sync::Arc;

use config::Config;
use relay::chat::ChatRelay;
use relay::dispatch::Dispatcher;
use relay::registry::ConnectionRegistry;
use store::MessageStore;
use telehealth_common::SnowflakeGenerator;

/// Shared application state available to all route handlers and the relay.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MessageStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub chat: Arc<ChatRelay>,
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the relay components around one store and one registry.
    pub fn new(config: Config, store: Arc<dyn MessageStore>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let snowflake = Arc::new(SnowflakeGenerator::new(config.worker_id));
        let chat = Arc::new(ChatRelay::new(registry.clone(), store.clone(), snowflake));
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), chat.clone()));

        Self {
            store,
            registry,
            chat,
            dispatcher,
            config: Arc::new(config),
        }
    }
}
