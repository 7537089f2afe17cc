//! Completion model abstractions.

pub mod client;
pub mod types;
