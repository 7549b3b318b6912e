//! Test server harness for E2E testing
//!
//! Provides `TestSignalServer` for spawning real signaling server instances
//! in tests.

use common::types::RoomId;
use signal_service::config::Config;
use signal_service::observability::HealthState;
use signal_service::routes::{self, AppState};
use signal_service::store::MeetingStore;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::mock_store::MockMeetingStore;

/// Test harness for spawning the signaling server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_join_flow_e2e() -> Result<(), anyhow::Error> {
///     let server = TestSignalServer::spawn().await?;
///     let room = server.create_meeting().await?;
///
///     let mut client = TestClient::connect(&server.ws_url()).await?;
///     client.send(&TestParticipant::new("Alice").join(&room)).await?;
///     Ok(())
/// }
/// ```
pub struct TestSignalServer {
    addr: SocketAddr,
    state: AppState,
    store: MockMeetingStore,
    cancel_token: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestSignalServer {
    /// Spawn a server with default configuration and an empty mock store.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(&[], MockMeetingStore::new()).await
    }

    /// Spawn a server with configuration overrides and the given store.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    ///
    /// # Arguments
    /// * `overrides` - `SIGNAL_*` variables applied on top of the defaults
    /// * `store` - Meeting store; keep a clone to script or inspect it
    pub async fn spawn_with(
        overrides: &[(&str, &str)],
        store: MockMeetingStore,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([(
            "SIGNAL_BIND_ADDRESS".to_string(),
            "127.0.0.1:0".to_string(),
        )]);
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let cancel_token = CancellationToken::new();
        let shared_store: Arc<dyn MeetingStore> = Arc::new(store.clone());
        let (state, _signaling_task) =
            AppState::spawn(config, shared_store, cancel_token.clone());

        let health_state = Arc::new(HealthState::new());
        health_state.set_ready();

        // Build routes using the service's real route builder
        let app = routes::build_routes(state.clone(), health_state, None);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            store,
            cancel_token,
            _handle: handle,
        })
    }

    /// Create a meeting directly in the store.
    pub async fn create_meeting(&self) -> Result<RoomId, anyhow::Error> {
        self.store
            .create_meeting()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create meeting: {}", e))
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the WebSocket endpoint URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the running application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the mock store backing the server.
    pub fn store(&self) -> &MockMeetingStore {
        &self.store
    }

    /// Cancel the signaling actor and every connection.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for TestSignalServer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_provides_addr() -> Result<(), anyhow::Error> {
        let server = TestSignalServer::spawn().await?;

        let addr = server.addr();
        assert!(addr.ip().is_loopback());
        assert!(addr.port() > 0);
        assert_eq!(server.url(), format!("http://{}", addr));
        assert_eq!(server.ws_url(), format!("ws://{}/ws", addr));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_meeting_goes_to_mock_store() -> Result<(), anyhow::Error> {
        let server = TestSignalServer::spawn().await?;

        let room = server.create_meeting().await?;
        assert!(server.store().meeting_exists(&room).await?);
        assert_eq!(server.store().create_calls(), 1);

        Ok(())
    }
}
