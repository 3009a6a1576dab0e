//! Core types for the polling bot client.
//!
//! This crate is transport-agnostic. The HTTP session, the dispatch tables and
//! the poll loop live in `tbot-telegram`, behind the [`messaging::port::BotApi`]
//! port defined here.

pub mod command;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod update;

pub use errors::{ApiFailure, ApiResult, Error, FailureKind, Result};
