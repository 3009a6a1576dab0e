//! Typed views of Bot API response payloads.

pub mod types;

pub use types::*;
