// src/error.rs
use crate::ingest::types::ItemKind;
use thiserror::Error;

/// Rejections raised while opening a stream, before any fetch happens.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid scope {scope:?}: must be at least {min} characters")]
    InvalidScope { scope: String, min: usize },

    #[error("invalid poll rate: must be a positive duration")]
    InvalidRate,

    #[error("invalid drift {drift}s: must not be negative")]
    InvalidDrift { drift: i64 },

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A tick whose fetch failed. Carries the fetcher's error unmodified.
#[derive(Debug, Error)]
#[error("{kind} fetch for r/{scope} failed: {source:#}")]
pub struct FetchError {
    pub kind: ItemKind,
    pub scope: String,
    #[source]
    pub source: anyhow::Error,
}
