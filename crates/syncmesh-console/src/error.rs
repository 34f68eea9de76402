use thiserror::Error;

use syncmesh_protocol::ProtocolError;

/// Client-side input checks run before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Sender, receiver or trimmed payload is missing.
    #[error("Please select sender and receiver servers")]
    MissingFields,

    #[error("Sender and receiver cannot be the same server")]
    SelfAddressed,
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The request never produced a response.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Response { status: u16, body: String },

    #[error("parse failure: {0}")]
    Parse(#[from] ProtocolError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid base URL '{url}': {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
