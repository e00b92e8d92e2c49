//! Error types for sitelens-core

use std::time::Duration;
use thiserror::Error;

/// Main error type for the sitelens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Event store request or response error
    #[error("event store error: {0}")]
    EventStore(String),

    /// Remote recommendation backend error
    #[error("recommendation error: {0}")]
    Recommendation(String),

    /// An outbound call did not finish in time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Time window with end before start
    #[error("invalid time window: {0}")]
    InvalidWindow(String),
}

/// Result type alias for sitelens-core
pub type Result<T> = std::result::Result<T, Error>;
