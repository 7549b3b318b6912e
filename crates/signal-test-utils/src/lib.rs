//! # Signal Test Utilities
//!
//! Shared test utilities for the Convox signaling service.
//!
//! This crate provides:
//! - `recording_sink` - `EventSink` that records every delivery in order
//! - `mock_store` - Scriptable `MeetingStore` with call counters
//! - `fixtures` - Participant builders producing client events
//! - `ws_client` - WebSocket test client speaking the signaling protocol
//! - `server_harness` - `TestSignalServer` for end-to-end tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use signal_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestSignalServer::spawn().await?;
//!     let room = server.create_meeting().await?;
//!
//!     let mut alice = TestClient::connect(&server.ws_url()).await?;
//!     alice.send(&TestParticipant::new("Alice").join(&room)).await?;
//!
//!     let event = alice.recv().await?;
//!     assert_eq!(event.name(), "existing-participants");
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod mock_store;
pub mod recording_sink;
pub mod server_harness;
pub mod ws_client;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_store::*;
pub use recording_sink::*;
pub use server_harness::*;
pub use ws_client::*;
