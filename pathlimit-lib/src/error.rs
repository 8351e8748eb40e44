use thiserror::Error;

use crate::pattern::{PatternError, Relationship};

/// Errors that can occur while loading or applying rate limit configuration
#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("Conflicting patterns {first:?} and {second:?} ({relationship})")]
    Conflict { first: String, second: String, relationship: Relationship },

    #[error("Configuration source error: {0}")]
    Source(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

pub type Result<T> = std::result::Result<T, RateLimitError>;
