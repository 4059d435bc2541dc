use anyhow::Context;
use clap::{Parser, Subcommand};
use dartmerge_core::{DartMergeError, MergeConfig, MergeRequest, MergeResult, DEFAULT_CONFIG_FILE};
use dartmerge_runner::{CancellationToken, MergeExecutor, RunnerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;

#[derive(Parser)]
#[command(name = "dmerge")]
#[command(about = "Run the Dart AST merge tool on a generated file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Merge executable (overrides the config file)
    #[arg(long, global = true)]
    executable: Option<PathBuf>,

    /// Timeout in seconds (overrides the config file)
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a user-modified file with its freshly generated version
    Run {
        /// File with the user's modifications
        #[arg(long)]
        current_file: PathBuf,

        /// Freshly generated file
        #[arg(long)]
        generated_file: PathBuf,

        /// Where the merged result is written
        #[arg(long)]
        output_file: PathBuf,

        /// Resolve the file arguments against this directory
        #[arg(long)]
        root: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a dartmerge.toml template
    Init,

    /// Validate the configured executable
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            generate_config_template(&cli.config)?;
        }
        Commands::Check => {
            let config = load_runner_config(&cli.config, cli.executable, cli.timeout)?;
            let executor = MergeExecutor::from_config(config)?;
            println!("✓ Executable: {}", executor.executable_path().display());
            println!("  Timeout: {}s", executor.config().timeout_secs);
            if let Some(dir) = &executor.config().working_directory {
                println!("  Working directory: {}", dir.display());
            }
        }
        Commands::Run {
            current_file,
            generated_file,
            output_file,
            root,
            json,
        } => {
            let file_config = MergeConfig::load_or_default(&cli.config)?;
            let root = root.or_else(|| file_config.project_root.clone());
            let config = apply_overrides(
                RunnerConfig::from_merge_config(&with_executable(file_config, cli.executable))?,
                cli.timeout,
            );
            let executor = MergeExecutor::from_config(config)?;

            let mut request = MergeRequest::new(current_file, generated_file, output_file);
            if let Some(root) = root {
                request = request.resolve_against(root);
            }

            let result = run_merge(&executor, &request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }

            if !result.success {
                process::exit(failure_exit_code(result.exit_code));
            }
        }
    }

    Ok(())
}

/// Run one merge; Ctrl-C cancels it and takes the child process down with it.
async fn run_merge(executor: &MergeExecutor, request: &MergeRequest) -> anyhow::Result<MergeResult> {
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling merge");
            signal_token.cancel();
        }
    });

    match executor.merge_with_cancel(request, cancel_token).await {
        Ok(result) => Ok(result),
        Err(e @ DartMergeError::Timeout { .. }) => {
            Err(e).context("Merge did not finish; retry with a larger --timeout")
        }
        Err(e) => Err(e.into()),
    }
}

fn with_executable(mut config: MergeConfig, executable: Option<PathBuf>) -> MergeConfig {
    if executable.is_some() {
        config.executable = executable;
    }
    config
}

fn apply_overrides(mut config: RunnerConfig, timeout: Option<u64>) -> RunnerConfig {
    if let Some(timeout_secs) = timeout {
        config.timeout_secs = timeout_secs;
    }
    config
}

fn load_runner_config(
    path: &Path,
    executable: Option<PathBuf>,
    timeout: Option<u64>,
) -> anyhow::Result<RunnerConfig> {
    let file_config = MergeConfig::load_or_default(path)?;
    let config = RunnerConfig::from_merge_config(&with_executable(file_config, executable))?;
    Ok(apply_overrides(config, timeout))
}

/// Exit status for a failed merge; codes outside 1..=255 collapse to 1.
fn failure_exit_code(exit_code: i32) -> i32 {
    if (1..=255).contains(&exit_code) {
        exit_code
    } else {
        1
    }
}

fn print_result(result: &MergeResult) {
    let status = if result.success { "SUCCESS" } else { "FAILED" };
    println!("Status: {}", status);
    println!("Exit code: {}", result.exit_code);
    println!("Duration: {}ms", result.execution_time_ms);
    if !result.output.is_empty() {
        println!("Output:\n{}", result.output.trim_end());
    }
    if result.truncated {
        println!("(output truncated)");
    }
}

fn generate_config_template(path: &Path) -> anyhow::Result<()> {
    let template = r#"# dartmerge.toml - Dart AST merge configuration

# Path to the merge executable, or a bare name found on PATH
executable = "./dart-ast-merge"

# Kill the merge tool if it runs longer than this
timeout_secs = 30

# Relative --current-file/--generated-file/--output-file arguments resolve against this
# project_root = "."

# working_directory = "."

# Extra environment for the merge tool
# [env]
# DART_MERGE_LOG = "info"
"#;

    if path.exists() {
        eprintln!("Error: config already exists at {}", path.display());
        eprintln!("Use a different filename or remove the existing file.");
        process::exit(1);
    }

    fs::write(path, template)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Created config template at {}", path.display());
    Ok(())
}
