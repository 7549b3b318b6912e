//! Convox Signaling Service Library
//!
//! Multi-party WebRTC signaling over WebSocket. The service never touches
//! media; it coordinates who is in which room and relays negotiation
//! messages (offers, answers, ICE candidates) and chat between peers.
//!
//! # Architecture
//!
//! ```text
//! WebSocket (one read task per socket)
//! └── SignalingActor (singleton)
//!     ├── SessionLifecycle
//!     │   ├── ConnectionRegistry (connection -> participant)
//!     │   └── RoomDirectory (room -> members)
//!     └── SignalingRouter -> ConnectionSinks -> ConnectionActor (one per socket)
//! ```
//!
//! # Key Design Decisions
//!
//! - **Single boundary**: every join, relay and departure is processed by
//!   the signaling actor, so the registry and directory always agree
//! - **Deliveries after transitions**: events are collected during a
//!   transition and dispatched once it has completed
//! - **Fire-and-forget delivery**: a slow socket drops events; it never
//!   stalls the room
//!
//! # Modules
//!
//! - [`signaling`] - Registry, directory, router and lifecycle state machine
//! - [`actors`] - Signaling and connection actors
//! - [`transport`] - WebSocket endpoint and socket writers
//! - [`store`] - Meeting store collaborator
//! - [`handlers`] - HTTP meeting endpoints
//! - [`routes`] - Router and application state
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with client error codes
//! - [`observability`] - Health probes and Prometheus metrics

#![warn(clippy::pedantic)]

pub mod actors;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod observability;
pub mod routes;
pub mod signaling;
pub mod store;
pub mod transport;
