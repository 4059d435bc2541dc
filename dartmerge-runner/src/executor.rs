use crate::process::{
    exit_code, force_kill, read_combined, resolve_executable, RunnerConfig, OUTPUT_DRAIN_GRACE,
};
use chrono::Utc;
use dartmerge_core::{DartMergeError, MergeRequest, MergeResult, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runs the external merge tool for one request at a time
///
/// The executor holds only immutable configuration, so clones and
/// concurrent calls never coordinate with each other.
#[derive(Debug, Clone)]
pub struct MergeExecutor {
    config: RunnerConfig,
}

/// How the wait on the child ended
enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

impl MergeExecutor {
    /// Executor with the default 30 second timeout
    pub fn new<P: Into<PathBuf>>(executable_path: P) -> Result<Self> {
        Self::from_config(RunnerConfig::new(executable_path))
    }

    pub fn with_timeout<P: Into<PathBuf>>(executable_path: P, timeout_secs: u64) -> Result<Self> {
        Self::from_config(RunnerConfig::new(executable_path).with_timeout_secs(timeout_secs))
    }

    /// Validate the configuration up front; a bad executable never reaches a merge call.
    pub fn from_config(mut config: RunnerConfig) -> Result<Self> {
        if config.timeout_secs == 0 {
            return Err(DartMergeError::InvalidConfiguration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        let base_dir = std::env::current_dir().map_err(|e| {
            DartMergeError::InvalidConfiguration(format!(
                "Cannot determine the current directory: {}",
                e
            ))
        })?;
        let resolved = resolve_executable(&config.executable_path, &base_dir)?;

        if let Some(dir) = &config.working_directory {
            if !dir.is_dir() {
                return Err(DartMergeError::InvalidConfiguration(format!(
                    "Working directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        debug!(
            executable = %resolved.display(),
            timeout_secs = config.timeout_secs,
            "Merge executor configured"
        );

        config.executable_path = resolved;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn executable_path(&self) -> &Path {
        &self.config.executable_path
    }

    /// Blocking merge.
    ///
    /// Drives the async path on a private current-thread runtime. Inside a
    /// tokio runtime that happens on a scoped helper thread, blocking the
    /// caller's worker; prefer [`MergeExecutor::merge_async`] there.
    pub fn merge<C, G, O>(&self, current_file: C, generated_file: G, output_file: O) -> Result<MergeResult>
    where
        C: AsRef<Path>,
        G: AsRef<Path>,
        O: AsRef<Path>,
    {
        let request = MergeRequest::new(
            current_file.as_ref(),
            generated_file.as_ref(),
            output_file.as_ref(),
        );
        self.block_on_execute(&request)
    }

    /// Blocking merge with every path joined onto `project_root`
    pub fn merge_relative<R, C, G, O>(
        &self,
        project_root: R,
        current_file: C,
        generated_file: G,
        output_file: O,
    ) -> Result<MergeResult>
    where
        R: AsRef<Path>,
        C: AsRef<Path>,
        G: AsRef<Path>,
        O: AsRef<Path>,
    {
        let request = MergeRequest::new(
            current_file.as_ref(),
            generated_file.as_ref(),
            output_file.as_ref(),
        )
        .resolve_against(project_root);
        self.block_on_execute(&request)
    }

    /// Non-blocking merge.
    ///
    /// Dropping the returned future kills the child process.
    pub async fn merge_async<C, G, O>(
        &self,
        current_file: C,
        generated_file: G,
        output_file: O,
    ) -> Result<MergeResult>
    where
        C: AsRef<Path>,
        G: AsRef<Path>,
        O: AsRef<Path>,
    {
        let request = MergeRequest::new(
            current_file.as_ref(),
            generated_file.as_ref(),
            output_file.as_ref(),
        );
        self.execute(&request).await
    }

    pub async fn merge_relative_async<R, C, G, O>(
        &self,
        project_root: R,
        current_file: C,
        generated_file: G,
        output_file: O,
    ) -> Result<MergeResult>
    where
        R: AsRef<Path>,
        C: AsRef<Path>,
        G: AsRef<Path>,
        O: AsRef<Path>,
    {
        let request = MergeRequest::new(
            current_file.as_ref(),
            generated_file.as_ref(),
            output_file.as_ref(),
        )
        .resolve_against(project_root);
        self.execute(&request).await
    }

    /// Merge that aborts with [`DartMergeError::Cancelled`] once `cancel_token` fires
    pub async fn merge_with_cancel(
        &self,
        request: &MergeRequest,
        cancel_token: CancellationToken,
    ) -> Result<MergeResult> {
        self.run(request, Some(cancel_token)).await
    }

    /// Execute a merge request
    pub async fn execute(&self, request: &MergeRequest) -> Result<MergeResult> {
        self.run(request, None).await
    }

    fn block_on_execute(&self, request: &MergeRequest) -> Result<MergeResult> {
        let drive = || -> Result<MergeResult> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(self.execute(request))
        };

        // A runtime cannot be started from a thread that already drives one
        if tokio::runtime::Handle::try_current().is_err() {
            return drive();
        }

        std::thread::scope(|scope| scope.spawn(drive).join()).map_err(|_| {
            DartMergeError::ExecutionError("Blocking merge thread panicked".to_string())
        })?
    }

    async fn run(
        &self,
        request: &MergeRequest,
        cancel_token: Option<CancellationToken>,
    ) -> Result<MergeResult> {
        request.validate()?;

        let invocation_id = Uuid::new_v4();
        let executable = &self.config.executable_path;

        info!(
            invocation_id = %invocation_id,
            current_file = %request.current_file.display(),
            generated_file = %request.generated_file.display(),
            output_file = %request.output_file.display(),
            "Starting merge"
        );

        let mut command = Command::new(executable);
        command
            .args(request.args())
            .envs(self.config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_directory {
            command.current_dir(dir);
        }

        let started_at = Utc::now();
        let start_instant = Instant::now();

        let mut child = command.spawn().map_err(|source| DartMergeError::LaunchError {
            executable: executable.clone(),
            source,
        })?;

        debug!(invocation_id = %invocation_id, pid = ?child.id(), "Merge process spawned");

        let stdout = child.stdout.take().ok_or_else(|| {
            DartMergeError::ExecutionError("Merge process stdout was not captured".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            DartMergeError::ExecutionError("Merge process stderr was not captured".to_string())
        })?;

        let mut combined = Vec::new();
        let mut capture = Box::pin(read_combined(
            stdout,
            stderr,
            self.config.max_output_bytes,
            &mut combined,
        ));
        let mut capture_result: Option<std::io::Result<bool>> = None;

        // Only the process exit races the deadline; open pipes do not
        let deadline = tokio::time::sleep(self.config.timeout());
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                status = child.wait() => break Outcome::Exited(status),
                result = &mut capture, if capture_result.is_none() => {
                    capture_result = Some(result);
                }
                _ = &mut deadline => break Outcome::TimedOut,
                _ = cancelled(cancel_token.as_ref()) => break Outcome::Cancelled,
            }
        };

        let status = match outcome {
            Outcome::Exited(Ok(status)) => status,
            Outcome::Exited(Err(e)) => {
                force_kill(&mut child).await;
                return Err(DartMergeError::ExecutionError(format!(
                    "Failed while waiting on merge process: {}",
                    e
                )));
            }
            Outcome::TimedOut => {
                warn!(
                    invocation_id = %invocation_id,
                    timeout_secs = self.config.timeout_secs,
                    "Merge process timed out; killing"
                );
                force_kill(&mut child).await;
                return Err(DartMergeError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
            Outcome::Cancelled => {
                info!(invocation_id = %invocation_id, "Merge cancelled; killing process");
                force_kill(&mut child).await;
                return Err(DartMergeError::Cancelled);
            }
        };

        let duration_ms = start_instant.elapsed().as_millis() as u64;
        let completed_at = Utc::now();

        let capture_result = match capture_result {
            Some(result) => Some(result),
            None => tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut capture).await.ok(),
        };
        drop(capture);

        let truncated = match capture_result {
            Some(Ok(truncated)) => truncated,
            Some(Err(e)) => {
                return Err(DartMergeError::ExecutionError(format!(
                    "Failed to read merge output: {}",
                    e
                )));
            }
            None => {
                warn!(
                    invocation_id = %invocation_id,
                    "Merge output still open after exit; keeping what was read"
                );
                true
            }
        };

        let exit_code = exit_code(status);
        let result = MergeResult::from_exit(
            exit_code,
            String::from_utf8_lossy(&combined).into_owned(),
            duration_ms,
            started_at,
            completed_at,
        )
        .with_truncated(truncated);

        if result.success {
            info!(
                invocation_id = %invocation_id,
                exit_code,
                duration_ms,
                "Merge completed"
            );
        } else {
            warn!(
                invocation_id = %invocation_id,
                exit_code,
                duration_ms,
                "Merge tool reported failure"
            );
        }

        Ok(result)
    }
}

/// One-shot merge: validate `executable_path`, then run a blocking merge.
pub fn merge_files<P, C, G, O>(
    executable_path: P,
    current_file: C,
    generated_file: G,
    output_file: O,
    timeout_secs: u64,
) -> Result<MergeResult>
where
    P: Into<PathBuf>,
    C: AsRef<Path>,
    G: AsRef<Path>,
    O: AsRef<Path>,
{
    MergeExecutor::with_timeout(executable_path, timeout_secs)?.merge(
        current_file,
        generated_file,
        output_file,
    )
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        // Zombies count as gone: they no longer execute anything
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => match stat.rfind(')') {
                Some(idx) => !matches!(stat[idx + 1..].trim_start().chars().next(), Some('Z' | 'X')),
                None => true,
            },
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    async fn wait_for_exit(pid: u32) -> bool {
        for _ in 0..100 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[cfg(target_os = "linux")]
    async fn wait_for_pid_file(path: &Path) -> u32 {
        for _ in 0..100 {
            if let Ok(content) = std::fs::read_to_string(path) {
                if let Ok(pid) = content.trim().parse() {
                    return pid;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("pid file {} never appeared", path.display());
    }

    #[test]
    fn test_new_rejects_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let err = MergeExecutor::new(dir.path().join("dart-ast-merge")).unwrap_err();
        assert!(matches!(err, DartMergeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_new_rejects_non_executable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dart-ast-merge");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = MergeExecutor::new(&path).unwrap_err();
        assert!(matches!(err, DartMergeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_new_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = MergeExecutor::new(dir.path()).unwrap_err();
        assert!(matches!(err, DartMergeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_new_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "exit 0");
        let err = MergeExecutor::with_timeout(&script, 0).unwrap_err();
        assert!(matches!(err, DartMergeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_new_rejects_missing_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "exit 0");
        let config = RunnerConfig::new(&script).with_working_directory(dir.path().join("gone"));
        let err = MergeExecutor::from_config(config).unwrap_err();
        assert!(matches!(err, DartMergeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_new_defaults_to_thirty_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "exit 0");
        let executor = MergeExecutor::new(&script).unwrap();
        assert_eq!(executor.config().timeout_secs, 30);
        assert!(executor.executable_path().ends_with("merge"));
    }

    #[test]
    fn test_merge_success() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf 'merged OK'");
        let executor = MergeExecutor::new(&script).unwrap();

        let result = executor.merge("a.dart", "b.dart", "c.dart").unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "merged OK");
        assert!(!result.truncated);
        assert!(result.execution_time_ms < 1000);
        assert!(result.completed_at >= result.started_at);
    }

    #[test]
    fn test_merge_nonzero_exit_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf 'conflict unresolved' >&2\nexit 2");
        let executor = MergeExecutor::new(&script).unwrap();

        let result = executor.merge("a.dart", "b.dart", "c.dart").unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.output, "conflict unresolved");
    }

    #[test]
    fn test_merge_passes_flags_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf '%s\\n' \"$@\"");
        let executor = MergeExecutor::new(&script).unwrap();

        let result = executor
            .merge("/p/current.dart", "/p/generated.dart", "/p/merged.dart")
            .unwrap();

        let args: Vec<&str> = result.output.lines().collect();
        assert_eq!(
            args,
            vec![
                "--current-file",
                "/p/current.dart",
                "--generated-file",
                "/p/generated.dart",
                "--output-file",
                "/p/merged.dart",
            ]
        );
    }

    #[test]
    fn test_merge_relative_matches_prejoined_merge() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf '%s\\n' \"$@\"");
        let executor = MergeExecutor::new(&script).unwrap();
        let root = Path::new("/work/app");

        let relative = executor
            .merge_relative(root, "a/b.dart", "c/d.dart", "e/f.dart")
            .unwrap();
        let joined = executor
            .merge(root.join("a/b.dart"), root.join("c/d.dart"), root.join("e/f.dart"))
            .unwrap();

        assert_eq!(relative.success, joined.success);
        assert_eq!(relative.exit_code, joined.exit_code);
        assert_eq!(relative.output, joined.output);
        assert!(relative.output.contains("/work/app/a/b.dart"));
    }

    #[test]
    fn test_merge_rejects_empty_path() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "exit 0");
        let executor = MergeExecutor::new(&script).unwrap();

        let err = executor.merge("a.dart", "b.dart", "").unwrap_err();
        assert!(matches!(err, DartMergeError::InvalidRequest(_)));
    }

    #[test]
    fn test_merge_applies_env_and_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf '%s %s' \"$MERGE_MODE\" \"$(pwd)\"");
        let work = tempfile::tempdir().unwrap();
        let config = RunnerConfig::new(&script)
            .with_env("MERGE_MODE", "strict")
            .with_working_directory(work.path());
        let executor = MergeExecutor::from_config(config).unwrap();

        let result = executor.merge("a.dart", "b.dart", "c.dart").unwrap();

        let canonical = work.path().canonicalize().unwrap();
        assert_eq!(result.output, format!("strict {}", canonical.display()));
    }

    #[test]
    fn test_merge_files_one_shot() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf 'done'");

        let result = merge_files(&script, "a.dart", "b.dart", "c.dart", 5).unwrap();
        assert!(result.success);
        assert_eq!(result.output, "done");
    }

    #[test]
    fn test_merge_timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = write_script(&dir, "merge", "echo $$ > \"$PID_FILE\"\nexec sleep 60");
        let config = RunnerConfig::new(&script)
            .with_timeout_secs(1)
            .with_env("PID_FILE", pid_file.to_string_lossy());
        let executor = MergeExecutor::from_config(config).unwrap();

        let started = Instant::now();
        let err = executor.merge("a.dart", "b.dart", "c.dart").unwrap_err();

        assert!(matches!(err, DartMergeError::Timeout { timeout_secs: 1 }));
        assert!(started.elapsed() < Duration::from_secs(10));

        #[cfg(target_os = "linux")]
        {
            let pid: u32 = std::fs::read_to_string(&pid_file)
                .unwrap()
                .trim()
                .parse()
                .unwrap();
            assert!(!is_running(pid));
        }
    }

    #[tokio::test]
    async fn test_merge_async_success() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf 'merged OK'");
        let executor = MergeExecutor::new(&script).unwrap();

        let result = executor
            .merge_async("a.dart", "b.dart", "c.dart")
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output, "merged OK");
    }

    #[tokio::test]
    async fn test_merge_async_combines_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf 'out'\nprintf 'err' >&2\nexit 1");
        let executor = MergeExecutor::new(&script).unwrap();

        let result = executor
            .merge_async("a.dart", "b.dart", "c.dart")
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, 1);
        assert_eq!(result.output.len(), 6);
        assert!(result.output.contains("out"));
        assert!(result.output.contains("err"));
    }

    #[tokio::test]
    async fn test_merge_relative_async() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf '%s\\n' \"$@\"");
        let executor = MergeExecutor::new(&script).unwrap();

        let result = executor
            .merge_relative_async("/root", "a.dart", "b.dart", "c.dart")
            .await
            .unwrap();

        assert!(result.output.contains("/root/a.dart"));
        assert!(result.output.contains("/root/c.dart"));
    }

    #[tokio::test]
    async fn test_concurrent_merges_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf '%s' \"$6\"");
        let executor = MergeExecutor::new(&script).unwrap();

        let (first, second, third) = tokio::join!(
            executor.merge_async("a", "b", "out-1"),
            executor.merge_async("a", "b", "out-2"),
            executor.merge_async("a", "b", "out-3"),
        );

        assert_eq!(first.unwrap().output, "out-1");
        assert_eq!(second.unwrap().output, "out-2");
        assert_eq!(third.unwrap().output, "out-3");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_merge_with_cancel_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = write_script(&dir, "merge", "echo $$ > \"$PID_FILE\"\nexec sleep 60");
        let config = RunnerConfig::new(&script).with_env("PID_FILE", pid_file.to_string_lossy());
        let executor = MergeExecutor::from_config(config).unwrap();

        let token = CancellationToken::new();
        let request = MergeRequest::new("a.dart", "b.dart", "c.dart");
        let task = {
            let executor = executor.clone();
            let token = token.clone();
            tokio::spawn(async move { executor.merge_with_cancel(&request, token).await })
        };

        let pid = wait_for_pid_file(&pid_file).await;
        token.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, DartMergeError::Cancelled));

        assert!(!is_running(pid));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropping_async_merge_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = write_script(&dir, "merge", "echo $$ > \"$PID_FILE\"\nexec sleep 60");
        let config = RunnerConfig::new(&script).with_env("PID_FILE", pid_file.to_string_lossy());
        let executor = MergeExecutor::from_config(config).unwrap();

        let task = tokio::spawn(async move {
            executor.merge_async("a.dart", "b.dart", "c.dart").await
        });

        let pid = wait_for_pid_file(&pid_file).await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(wait_for_exit(pid).await);
    }

    #[tokio::test]
    async fn test_async_timeout_reports_configured_duration() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "exec sleep 60");
        let executor = MergeExecutor::with_timeout(&script, 1).unwrap();

        let err = executor
            .merge_async("a.dart", "b.dart", "c.dart")
            .await
            .unwrap_err();

        assert!(matches!(err, DartMergeError::Timeout { timeout_secs: 1 }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_background_child_holding_pipes_does_not_time_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "sleep 5 &\nprintf 'merged OK'\nexit 0");
        let executor = MergeExecutor::with_timeout(&script, 2).unwrap();

        let started = Instant::now();
        let result = executor.merge("a.dart", "b.dart", "c.dart").unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, "merged OK");
        assert!(result.truncated);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_output_cap_marks_result_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf '0123456789'");
        let config = RunnerConfig::new(&script).with_max_output_bytes(4);
        let executor = MergeExecutor::from_config(config).unwrap();

        let result = executor.merge("a.dart", "b.dart", "c.dart").unwrap();

        assert!(result.success);
        assert_eq!(result.output, "0123");
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_blocking_merge_inside_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf 'merged OK'");
        let executor = MergeExecutor::new(&script).unwrap();

        let result = executor.merge("a.dart", "b.dart", "c.dart").unwrap();
        assert!(result.success);
        assert_eq!(result.output, "merged OK");

        let relative = executor
            .merge_relative("/work", "a.dart", "b.dart", "c.dart")
            .unwrap();
        assert!(relative.success);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_merge_inside_multi_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "merge", "printf 'merged OK'");
        let executor = MergeExecutor::new(&script).unwrap();

        let result = executor.merge("a.dart", "b.dart", "c.dart").unwrap();
        assert_eq!(result.output, "merged OK");
    }

    #[test]
    fn test_new_accepts_bare_name_found_on_path() {
        let executor = MergeExecutor::new("sh").unwrap();
        assert!(executor.executable_path().is_absolute());
    }
}
