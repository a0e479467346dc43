//! Runtime configuration (§10.1)
//!
//! Everything here is process-wide and read once at startup: where the
//! config directory lives, how aggressive the loop-protection threshold is,
//! the default HTTP deadline for the API invoker, and the log level. Flow
//! and API catalog content itself lives in [`crate::flow::registry`], not
//! here — this module only describes how the binary starts up.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is set but not valid: {1}")]
    InvalidEnv(&'static str, String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Process-wide runtime knobs, distinct from the per-flow [`crate::flow::registry::ConfigRegistry`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub config_dir: PathBuf,
    pub loop_protection_threshold: usize,
    pub http_timeout: Duration,
    pub log_level: String,
}

impl RuntimeConfig {
    /// Read knobs from the environment, following the same
    /// env-var-with-typed-default convention this codebase already uses.
    /// `config_dir` comes from the CLI, not the environment.
    pub fn from_env(config_dir: PathBuf) -> ConfigResult<Self> {
        let loop_protection_threshold = parse_env(
            "IVR_LOOP_PROTECTION_THRESHOLD",
            crate::flow::DEFAULT_LOOP_PROTECTION_THRESHOLD,
        )?;
        let http_timeout_seconds = parse_env("IVR_HTTP_TIMEOUT_SECONDS", DEFAULT_HTTP_TIMEOUT_SECONDS)?;
        let log_level = std::env::var("IVR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            config_dir,
            loop_protection_threshold,
            http_timeout: Duration::from_secs(http_timeout_seconds),
            log_level,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> ConfigResult<T> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidEnv(name, raw)),
        Err(_) => Ok(default),
    }
}
