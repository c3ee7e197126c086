pub mod config;
pub mod error;
pub mod models;

pub use config::{ExecConfig, WorkerAppConfig, WorkerConfig};
pub use error::{Result, WorkerError};
pub use models::{JudgeExecutor, Runner};
