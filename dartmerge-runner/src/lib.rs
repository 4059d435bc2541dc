pub mod executor;
pub mod process;

pub use executor::{merge_files, MergeExecutor};
pub use process::{RunnerConfig, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_SECS};
pub use tokio_util::sync::CancellationToken;
