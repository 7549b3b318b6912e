//! Actor layer.
//!
//! ```text
//! SignalingActor (singleton)
//! ├── owns SessionLifecycle (registry + directory + phases)
//! └── flushes each transition's outbox to the EventSink
//!     └── ConnectionActor (one per socket, writes frames)
//! ```
//!
//! - **Single boundary**: every state change goes through the signaling mailbox
//! - **CancellationToken propagation**: connection actors use child tokens of
//!   the signaling actor's token, so one cancel drains everything
//! - **Mailbox monitoring**: depth thresholds with metrics (Signaling: 200/1000,
//!   Connection: 32/128)
//!
//! # Modules
//!
//! - [`signaling`] - `SignalingActor` and its handle
//! - [`connection`] - `ConnectionActor` per WebSocket
//! - [`messages`] - Message types for actor communication
//! - [`metrics`] - Mailbox monitoring and actor metrics

pub mod connection;
pub mod messages;
pub mod metrics;
pub mod signaling;

pub use connection::{ConnectionActor, ConnectionActorHandle, SendFailure};
pub use messages::{ConnectionMessage, SignalingMessage};
pub use metrics::{ActorMetrics, ActorType, MailboxMonitor};
pub use signaling::{SignalingActor, SignalingHandle};
