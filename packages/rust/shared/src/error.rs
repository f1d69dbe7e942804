//! Error types for docenrich.
//!
//! Library crates use [`EnrichError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Only [`EnrichError::InputShape`], [`EnrichError::Config`] raised while
//! building a collaborator, and [`EnrichError::Io`] ever reach the caller of
//! `enrich`. [`EnrichError::SourceFetch`] is always contained at the
//! aggregation boundary.

use std::path::PathBuf;

/// Top-level error type for all docenrich operations.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    /// Metadata or context does not have the expected structural shape.
    #[error("input shape error: {message}")]
    InputShape { message: String },

    /// One source's network call failed (transport, status, or body decode).
    #[error("source fetch error ({source_type} {url}): {message}")]
    SourceFetch {
        source_type: String,
        url: String,
        message: String,
    },

    /// A required configuration value is missing or invalid.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP client setup error.
    #[error("network error: {0}")]
    Network(String),

    /// Config or document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The run was cancelled or its deadline elapsed.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EnrichError>;

impl EnrichError {
    /// Create an input shape error from any displayable message.
    pub fn input_shape(msg: impl Into<String>) -> Self {
        Self::InputShape {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a source fetch error for one configured source.
    pub fn source_fetch(
        source_type: impl Into<String>,
        url: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::SourceFetch {
            source_type: source_type.into(),
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
