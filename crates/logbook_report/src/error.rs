//! Custom error types for the report pipeline.

use logbook_client::{FetchIncomplete, LogbookError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Logbook(#[from] LogbookError),

    #[error(transparent)]
    Fetch(#[from] FetchIncomplete),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ReportError {
    /// Pages persisted before the failure, when the failure happened mid-fetch.
    pub fn pages_completed(&self) -> Option<u32> {
        match self {
            ReportError::Fetch(incomplete) => Some(incomplete.pages_completed),
            _ => None,
        }
    }
}

/// Result type alias for report operations.
pub type ReportResult<T> = Result<T, ReportError>;
