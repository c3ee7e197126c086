//! Development sandbox: plain child processes, no isolation.
//!
//! Each run gets its own process group so a timeout takes down everything it spawned. Peak
//! memory is the resident high-water mark of the direct child, sampled from procfs while it
//! runs (0 on platforms without procfs).

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ExecutionResult, Sandbox, SandboxError};

const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSandbox;

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

/// SIGKILL every process left in the group led by `pid`.
#[cfg(unix)]
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // A negative pid addresses the whole process group.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(pid, error = %err, "Failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

/// `VmHWM` of a live process in kilobytes.
#[cfg(target_os = "linux")]
async fn read_peak_rss_kb(pid: u32) -> Option<i64> {
    let status = tokio::fs::read_to_string(format!("/proc/{pid}/status"))
        .await
        .ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmHWM:"))
        .and_then(|v| v.trim().trim_end_matches("kB").trim().parse().ok())
}

#[cfg(not(target_os = "linux"))]
async fn read_peak_rss_kb(_pid: u32) -> Option<i64> {
    None
}

/// Track the high-water mark of `pid` until it exits or the task is aborted.
async fn sample_peak_rss(pid: u32, peak_kb: Arc<AtomicI64>) {
    let mut tick = tokio::time::interval(MEMORY_SAMPLE_INTERVAL);
    loop {
        tick.tick().await;
        match read_peak_rss_kb(pid).await {
            Some(kb) => {
                peak_kb.fetch_max(kb, Ordering::Relaxed);
            }
            // Gone, or a zombie without memory statistics.
            None => return,
        }
    }
}

#[async_trait]
impl Sandbox for ProcessSandbox {
    async fn execute(
        &self,
        workdir: &Path,
        argv: &[String],
        stdin: &[u8],
        wall_timeout: Duration,
    ) -> Result<ExecutionResult, SandboxError> {
        let (program, args) = argv.split_first().ok_or(SandboxError::EmptyCommand)?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
            program: program.clone(),
            source,
        })?;

        let start = Instant::now();
        let pid = child.id();
        let peak_kb = Arc::new(AtomicI64::new(0));
        let sampler = pid.map(|pid| tokio::spawn(sample_peak_rss(pid, peak_kb.clone())));

        let pipe = child.stdin.take();
        let feed = async move {
            if let Some(mut pipe) = pipe {
                // The program may exit without reading its input.
                let _ = pipe.write_all(stdin).await;
            }
        };
        let run = async move {
            let ((), output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let outcome = tokio::time::timeout(wall_timeout, run).await;
        let elapsed = start.elapsed();
        if let Some(sampler) = sampler {
            sampler.abort();
        }
        // Reap whatever the program left running in the background.
        if let Some(pid) = pid {
            kill_group(pid);
        }
        let memory_kb = peak_kb.load(Ordering::Relaxed);

        match outcome {
            Ok(Ok(output)) => Ok(ExecutionResult {
                exit_code: output.status.code(),
                signal: exit_signal(&output.status),
                elapsed,
                memory_kb,
                timed_out: false,
                stdout: output.stdout,
                stderr: output.stderr,
            }),
            Ok(Err(e)) => Err(SandboxError::Execution(format!(
                "failed to wait for '{program}': {e}"
            ))),
            Err(_) => {
                debug!(
                    program = %program,
                    timeout_ms = wall_timeout.as_millis() as u64,
                    "Killed on wall timeout"
                );
                Ok(ExecutionResult {
                    elapsed,
                    memory_kb,
                    timed_out: true,
                    ..Default::default()
                })
            }
        }
    }
}
