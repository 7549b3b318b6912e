//! Common utilities and types shared across Convox components.

#![warn(clippy::pedantic)]

/// Module for identifier types (connections, rooms)
pub mod types;

/// Module for the JSON signaling protocol spoken over the WebSocket
pub mod protocol;
