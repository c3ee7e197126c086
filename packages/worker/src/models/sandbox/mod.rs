pub mod error;
pub mod process;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

pub use error::SandboxError;
pub use process::ProcessSandbox;

/// What happened to one program run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub elapsed: Duration,
    /// Peak memory in kilobytes; 0 when the sandbox cannot measure it.
    pub memory_kb: i64,
    /// Killed for exceeding the wall-clock budget.
    pub timed_out: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.signal.is_none() && self.exit_code == Some(0)
    }

    pub fn elapsed_ms(&self) -> i32 {
        i32::try_from(self.elapsed.as_millis()).unwrap_or(i32::MAX)
    }

    /// Compiler-style diagnostics: stderr followed by stdout.
    pub fn diagnostics(&self) -> String {
        format!(
            "{}{}",
            String::from_utf8_lossy(&self.stderr),
            String::from_utf8_lossy(&self.stdout)
        )
    }
}

/// Runs a command line inside a working directory under a wall-clock bound.
///
/// `Err` means the harness could not run the program at all; anything the program itself
/// does (crash, timeout, non-zero exit) is reported through [`ExecutionResult`].
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(
        &self,
        workdir: &Path,
        argv: &[String],
        stdin: &[u8],
        wall_timeout: Duration,
    ) -> Result<ExecutionResult, SandboxError>;
}
