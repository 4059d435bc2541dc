// Child process plumbing shared by every merge invocation

use dartmerge_core::{DartMergeError, MergeConfig, Result};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tracing::warn;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Cap on captured output; anything past it is drained and dropped.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// How long to keep reading after the tool exits, in case a process it
/// left running in the background still holds the pipes open.
pub(crate) const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

const READ_CHUNK: usize = 8192;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub executable_path: PathBuf,
    pub timeout_secs: u64,
    pub env: Vec<(String, String)>,
    pub working_directory: Option<PathBuf>,
    pub max_output_bytes: usize,
}

impl RunnerConfig {
    pub fn new<P: Into<PathBuf>>(executable_path: P) -> Self {
        Self {
            executable_path: executable_path.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            env: Vec::new(),
            working_directory: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_working_directory<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build from a loaded `dartmerge.toml`; the file must name an executable.
    pub fn from_merge_config(config: &MergeConfig) -> Result<Self> {
        let executable = config.executable.clone().ok_or_else(|| {
            DartMergeError::InvalidConfiguration("No merge executable configured".to_string())
        })?;

        let mut runner_config = Self::new(executable);
        if let Some(timeout_secs) = config.timeout_secs {
            runner_config.timeout_secs = timeout_secs;
        }
        if let Some(max_output_bytes) = config.max_output_bytes {
            runner_config.max_output_bytes = max_output_bytes;
        }
        runner_config.working_directory = config.working_directory.clone();
        runner_config.env = config
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(runner_config)
    }
}

/// Resolve the merge executable against `base_dir`.
///
/// The literal path wins: when it exists it must be an executable file.
/// Only a bare name with nothing behind it in `base_dir` is looked up on PATH.
pub fn resolve_executable(path: &Path, base_dir: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(DartMergeError::InvalidConfiguration(
            "Executable path must not be empty".to_string(),
        ));
    }

    let literal = base_dir.join(path);
    if literal.exists() {
        let canonical = literal.canonicalize().map_err(|e| {
            DartMergeError::InvalidConfiguration(format!(
                "Cannot resolve executable {}: {}",
                literal.display(),
                e
            ))
        })?;
        if !canonical.is_file() {
            return Err(DartMergeError::InvalidConfiguration(format!(
                "Executable is not a file: {}",
                canonical.display()
            )));
        }
        // An absolute path is checked in place, never searched
        return which::which(&canonical).map_err(|e| {
            DartMergeError::InvalidConfiguration(format!(
                "Executable lacks permission to run: {}: {}",
                canonical.display(),
                e
            ))
        });
    }

    let is_bare_name = path.is_relative() && path.components().count() == 1;
    if is_bare_name {
        return which::which(path).map_err(|e| {
            DartMergeError::InvalidConfiguration(format!(
                "Executable not found in {} or on PATH: {}: {}",
                base_dir.display(),
                path.display(),
                e
            ))
        });
    }

    Err(DartMergeError::InvalidConfiguration(format!(
        "Executable not found: {}",
        literal.display()
    )))
}

/// Read stdout and stderr concurrently into `combined`, in arrival order.
///
/// Returns whether anything past `max_bytes` was dropped. Bytes already read
/// stay in `combined` even if this future is dropped before EOF.
pub(crate) async fn read_combined<O, E>(
    mut stdout: O,
    mut stderr: E,
    max_bytes: usize,
    combined: &mut Vec<u8>,
) -> std::io::Result<bool>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out_chunk = [0u8; READ_CHUNK];
    let mut err_chunk = [0u8; READ_CHUNK];
    let mut out_open = true;
    let mut err_open = true;
    let mut truncated = false;

    while out_open || err_open {
        let (chunk, n) = tokio::select! {
            n = stdout.read(&mut out_chunk), if out_open => {
                let n = n?;
                if n == 0 {
                    out_open = false;
                }
                (&out_chunk[..n], n)
            }
            n = stderr.read(&mut err_chunk), if err_open => {
                let n = n?;
                if n == 0 {
                    err_open = false;
                }
                (&err_chunk[..n], n)
            }
        };

        if n == 0 {
            continue;
        }

        let remaining = max_bytes.saturating_sub(combined.len());
        if remaining < n && !truncated {
            warn!(max_bytes, "merge output exceeded limit, truncating");
            truncated = true;
        }
        combined.extend_from_slice(&chunk[..n.min(remaining)]);
    }

    Ok(truncated)
}

/// Exit code as an integer; signal deaths map to `128 + signal`.
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

/// Hard-kill the child and reap it so no zombie or orphan is left behind.
pub(crate) async fn force_kill(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        // Already exited; still reaped below
        warn!(error = %e, "failed to kill merge process");
    }
    if let Err(e) = child.wait().await {
        warn!(error = %e, "failed to reap merge process");
    }
}
