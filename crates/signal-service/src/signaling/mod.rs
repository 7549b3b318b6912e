//! Signaling core.
//!
//! - [`registry`]: connection ID -> participant
//! - [`directory`]: room ID -> member connection IDs
//! - [`router`]: unicast/broadcast addressing and dispatch to the transport
//! - [`lifecycle`]: the join/relay/leave state machine over both maps
//!
//! Nothing in this module is thread-safe on its own. The
//! [`crate::actors::SignalingActor`] owns the lifecycle and serializes access.

pub mod directory;
pub mod lifecycle;
pub mod registry;
pub mod router;

pub use directory::RoomDirectory;
pub use lifecycle::{
    JoinReceipt, Negotiation, RelayOutcome, RelayScope, RoomLookup, SessionLifecycle,
    SessionPhase, SignalingSnapshot, UNKNOWN_SENDER,
};
pub use registry::{ConnectionRegistry, Participant};
pub use router::{Delivery, DropReason, EventSink, Outbox, SignalingRouter};
