//! Error types for the Sift engine.

use thiserror::Error;

/// All possible errors from the Sift engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // State errors
    #[error("invalid page size: take must be greater than zero")]
    InvalidPageSize,

    // Protocol errors
    #[error("unrecognized response shape: {0}")]
    UnrecognizedResponse(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
