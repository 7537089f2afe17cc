//! Messenger abstractions (Slack today).

pub mod port;
pub mod types;
