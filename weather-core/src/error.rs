use std::path::PathBuf;

use crate::validate::DateRangeError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidDateRange(#[from] DateRangeError),

    /// Missing or malformed caller input.
    #[error("{0}")]
    Validation(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// The geocoding provider had no match for the query.
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// Geocoding or weather provider failure (network, HTTP status, payload shape).
    #[error("{0:#}")]
    Upstream(#[from] anyhow::Error),

    #[error("Failed to {action} {}: {source}", .path.display())]
    Persistence {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Record file {} is not valid JSON: {source}", .path.display())]
    CorruptData {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub(crate) fn persistence(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::Persistence {
            action,
            path: path.into(),
            source,
        }
    }
}
