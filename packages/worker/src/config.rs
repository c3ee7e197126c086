use std::time::Duration;

use common::config::{DatabaseConfig, LeaseConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// First delay after an empty poll. Default: 200.
    #[serde(default = "default_poll_base_ms")]
    pub poll_base_ms: u64,
    /// Upper bound on the empty-poll delay. Default: 5000.
    #[serde(default = "default_poll_max_ms")]
    pub poll_max_ms: u64,
    /// Parent directory for per-submission working directories. Default: system temp dir.
    #[serde(default = "default_workdir")]
    pub workdir: String,
    /// Root of the test data tree. Default: "testdata".
    #[serde(default = "default_testdata_root")]
    pub testdata_root: String,
    /// Test cases kept in memory. Default: 64.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Language registry. Default: "langs/langs.toml".
    #[serde(default = "default_langs_path")]
    pub langs_path: String,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_poll_base_ms() -> u64 {
    200
}
fn default_poll_max_ms() -> u64 {
    5_000
}
fn default_workdir() -> String {
    std::env::temp_dir().to_string_lossy().into_owned()
}
fn default_testdata_root() -> String {
    "testdata".into()
}
fn default_cache_size() -> usize {
    64
}
fn default_langs_path() -> String {
    "langs/langs.toml".into()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            poll_base_ms: default_poll_base_ms(),
            poll_max_ms: default_poll_max_ms(),
            workdir: default_workdir(),
            testdata_root: default_testdata_root(),
            cache_size: default_cache_size(),
            langs_path: default_langs_path(),
        }
    }
}

/// Time bounds for compiling and running untrusted programs.
#[derive(Debug, Deserialize, Clone)]
pub struct ExecConfig {
    /// Wall-clock slack added to the problem time limit. Default: 1000.
    #[serde(default = "default_overhead_ms")]
    pub overhead_ms: u64,
    /// No run may exceed this wall-clock bound. Default: 30000.
    #[serde(default = "default_hard_ceiling_ms")]
    pub hard_ceiling_ms: u64,
    /// Wall-clock bound for a compile step. Default: 30000.
    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,
}

fn default_overhead_ms() -> u64 {
    1_000
}
fn default_hard_ceiling_ms() -> u64 {
    30_000
}
fn default_compile_timeout_ms() -> u64 {
    30_000
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            overhead_ms: default_overhead_ms(),
            hard_ceiling_ms: default_hard_ceiling_ms(),
            compile_timeout_ms: default_compile_timeout_ms(),
        }
    }
}

impl ExecConfig {
    /// Wall-clock budget for one run under `time_limit_ms`.
    pub fn run_timeout(&self, time_limit_ms: i32) -> Duration {
        let limit = u64::try_from(time_limit_ms).unwrap_or(0);
        Duration::from_millis(
            limit
                .saturating_add(self.overhead_ms)
                .min(self.hard_ceiling_ms),
        )
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms.min(self.hard_ceiling_ms))
    }
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub lease: LeaseConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("JUDGE_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("worker.id", "worker-1")?
            .set_default("worker.langs_path", "langs/langs.toml")?
            .set_default("lease.ttl_secs", 60_i64)?
            .set_default("lease.heartbeat_interval_secs", 10_i64)?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("JUDGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.lease.heartbeat_interval_secs.max(1))
    }
}
