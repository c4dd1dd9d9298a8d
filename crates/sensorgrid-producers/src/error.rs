//! Error types for producer setup.

use thiserror::Error;

/// Result type alias for producer installation.
pub type ProducerResult<T> = Result<T, ProducerError>;

/// Errors raised while building producers from configuration.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("unknown producer kind {0:?}")]
    UnknownKind(String),

    #[error("invalid options for {kind} producer: {source}")]
    Options {
        kind: &'static str,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {what} name {name:?}")]
    InvalidName { what: &'static str, name: String },
}
