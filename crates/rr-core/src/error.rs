//! # AppError
//!
//! Centralized error handling for the reel-review workspace.
//! Maps registry and platform failures to actionable error types.

use thiserror::Error;

/// The primary error type for all rr-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Video, Guild)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The cursor selector did not resolve to a video
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Malformed input (e.g., unparsable request body)
    #[error("validation error: {0}")]
    Validation(String),

    /// The chat platform rejected or failed a call (react, member fetch, ban)
    #[error("platform error: {0}")]
    Platform(String),

    /// Caller failed to prove it may use the endpoint (e.g., relay secret)
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

/// A specialized Result type for reel-review logic.
pub type Result<T> = std::result::Result<T, AppError>;
