pub mod config;
pub mod error;
pub mod models;

pub use config::{MergeConfig, DEFAULT_CONFIG_FILE};
pub use error::{DartMergeError, Result};
pub use models::*;
