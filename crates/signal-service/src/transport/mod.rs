//! WebSocket transport.
//!
//! - [`ws`]: upgrade handler and per-socket read loop
//! - [`sinks`]: connection ID -> writer lookup used by the signaling router

pub mod sinks;
pub mod ws;

pub use sinks::ConnectionSinks;
pub use ws::ws_handler;
