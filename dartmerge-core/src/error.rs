use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DartMergeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid merge request: {0}")]
    InvalidRequest(String),

    #[error("Failed to launch {}: {source}", .executable.display())]
    LaunchError {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The merge tool was killed after exceeding its time budget.
    #[error("Merge process exceeded the timeout of {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Merge cancelled")]
    Cancelled,

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DartMergeError {
    /// True for failures the caller may retry with the same configuration.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DartMergeError::Timeout { .. } | DartMergeError::LaunchError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DartMergeError>;
