//! Crate-wide error type.
//!
//! Fetch and decode tasks never propagate a `Result` past the result queue
//! (see `fetch.rs`): every failure is folded into a `String` message carried
//! by `RetryState`. `MapError` exists for the synchronous, caller-facing
//! surface — constructing a viewport, parsing a URL template, or driving the
//! orchestrator directly in a test.

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid provider template: {0}")]
    Provider(String),
}
