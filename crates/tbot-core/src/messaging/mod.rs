//! Outbound Bot API port and its request types.

pub mod port;
pub mod types;
