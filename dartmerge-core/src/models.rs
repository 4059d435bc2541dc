use crate::error::{DartMergeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

pub const CURRENT_FILE_FLAG: &str = "--current-file";
pub const GENERATED_FILE_FLAG: &str = "--generated-file";
pub const OUTPUT_FILE_FLAG: &str = "--output-file";

/// The three files handed to the merge tool for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    /// File carrying the user's modifications
    pub current_file: PathBuf,
    /// Freshly generated file
    pub generated_file: PathBuf,
    /// Destination of the merged result
    pub output_file: PathBuf,
}

impl MergeRequest {
    pub fn new(
        current_file: impl Into<PathBuf>,
        generated_file: impl Into<PathBuf>,
        output_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            current_file: current_file.into(),
            generated_file: generated_file.into(),
            output_file: output_file.into(),
        }
    }

    /// Reject empty paths. Existence is the merge tool's concern.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("current_file", &self.current_file),
            ("generated_file", &self.generated_file),
            ("output_file", &self.output_file),
        ];

        for (name, path) in fields {
            if path.as_os_str().is_empty() {
                return Err(DartMergeError::InvalidRequest(format!(
                    "{} must not be empty",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Command-line arguments in the order the merge tool expects them
    pub fn args(&self) -> Vec<OsString> {
        vec![
            OsString::from(CURRENT_FILE_FLAG),
            self.current_file.clone().into_os_string(),
            OsString::from(GENERATED_FILE_FLAG),
            self.generated_file.clone().into_os_string(),
            OsString::from(OUTPUT_FILE_FLAG),
            self.output_file.clone().into_os_string(),
        ]
    }

    /// Join every path onto `root`
    pub fn resolve_against<P: AsRef<Path>>(&self, root: P) -> Self {
        let root = root.as_ref();
        Self {
            current_file: root.join(&self.current_file),
            generated_file: root.join(&self.generated_file),
            output_file: root.join(&self.output_file),
        }
    }
}

/// Outcome of a merge tool run that exited on its own
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeResult {
    pub success: bool,
    pub exit_code: i32,
    /// Interleaved stdout and stderr, capped at the runner's output limit
    pub output: String,
    /// Set when `output` is not the whole stream: the cap was hit, or the
    /// pipes were still held open after the tool exited.
    #[serde(default)]
    pub truncated: bool,
    pub execution_time_ms: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl MergeResult {
    pub fn from_exit(
        exit_code: i32,
        output: String,
        execution_time_ms: u64,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            success: exit_code == 0,
            exit_code,
            output,
            truncated: false,
            execution_time_ms,
            started_at,
            completed_at,
        }
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }
}

impl fmt::Display for MergeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MergeResult(success={}, exitCode={}, executionTime={}ms)",
            self.success, self.exit_code, self.execution_time_ms
        )
    }
}
