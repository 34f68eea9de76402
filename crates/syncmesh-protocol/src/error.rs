use thiserror::Error;

/// Errors raised while decoding admin API bodies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),
}
