/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the router can
/// branch on the failure kind (report in thread vs. fatal at startup).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Platform or completion API unreachable, or answered with a non-2xx status.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("completion API returned no candidates")]
    NoCandidates,

    #[error("dispatch error: {0}")]
    Dispatch(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
