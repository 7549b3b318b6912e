//! HTTP handlers.

pub mod meetings;

pub use meetings::{create_meeting, join_meeting};
