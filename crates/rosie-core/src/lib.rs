//! Core domain + application logic for Rosie, the Slack completion bot.
//!
//! This crate is intentionally framework-agnostic. Slack and the completion
//! provider live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod hashing;
pub mod history;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod prompt;
pub mod router;

pub use errors::{Error, Result};
