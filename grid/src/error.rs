//! Unified error handling for the grid.

/// Grid error type.
///
/// Errors are cloneable because the latest one travels to every subscriber
/// alongside the retained last-good result.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GridError {
    #[error("Engine error: {0}")]
    Engine(#[from] sift_engine::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Saved state rejected: {0}")]
    StateLoad(String),
}

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
