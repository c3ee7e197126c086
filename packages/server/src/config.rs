use common::config::{DatabaseConfig, LeaseConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty allows any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Limits applied when accepting submissions.
#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// Largest accepted source, in bytes. Default: 1048576.
    #[serde(default = "default_max_source_size")]
    pub max_source_size: usize,
}

fn default_max_source_size() -> usize {
    judge::submit::DEFAULT_MAX_SOURCE_SIZE
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_source_size: default_max_source_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LangsConfig {
    /// Path of the language registry. Default: "langs/langs.toml".
    #[serde(default = "default_langs_path")]
    pub path: String,
}

fn default_langs_path() -> String {
    "langs/langs.toml".into()
}

impl Default for LangsConfig {
    fn default() -> Self {
        Self {
            path: default_langs_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub lease: LeaseConfig,
    #[serde(default)]
    pub langs: LangsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("JUDGE_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("auth.jwt_secret", "change-me")?
            // Load from config/config.toml
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., JUDGE__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("JUDGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
