//! Connection lifecycle: open, close, and process shutdown.

use telehealth_common::id::{prefix, prefixed_ulid};

use crate::error::RelayError;

use super::registry::{ConnectionRegistry, OutboundReceiver};

/// Register a freshly accepted transport. Returns its id and outbound queue.
pub fn on_connect(registry: &ConnectionRegistry) -> Result<(String, OutboundReceiver), RelayError> {
    let connection_id = prefixed_ulid(prefix::CONNECTION);
    let outbound = registry.register(&connection_id)?;
    tracing::info!(%connection_id, "connection opened");
    Ok((connection_id, outbound))
}

/// Forget a closed connection and all its memberships.
///
/// Peers are not notified; a reconnecting client must join its rooms again.
pub fn on_disconnect(registry: &ConnectionRegistry, connection_id: &str) {
    let rooms = registry.remove_connection(connection_id);
    tracing::info!(%connection_id, rooms = rooms.len(), "connection closed");
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
