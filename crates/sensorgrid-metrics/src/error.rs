//! Error types for metric collection.

use thiserror::Error;

/// Boxed error returned by pre-scrape callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for collection.
pub type CollectResult<T> = Result<T, CollectError>;

/// Reasons a scrape did not produce a complete document.
///
/// Any bytes already written to the output buffer belong to an incomplete
/// document and must be discarded by the caller.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("before-collect callback failed: {0}")]
    Callback(#[source] BoxError),

    #[error("collection cancelled")]
    Cancelled,
}
