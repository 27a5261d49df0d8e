//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from `JOBWARDEN_*` environment variables
//! 2. If none are set, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. With no file either, the built-in defaults are used
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! Unset variables keep their default value.
//! - `JOBWARDEN_BREAKER_FAILURE_THRESHOLD`
//! - `JOBWARDEN_BREAKER_RECOVERY_TIMEOUT_SECS`
//! - `JOBWARDEN_BREAKER_SUCCESS_THRESHOLD`
//! - `JOBWARDEN_BREAKER_CALL_TIMEOUT_SECS`
//! - `JOBWARDEN_MAX_RETRIES`
//! - `JOBWARDEN_RETRY_BASE_DELAY_MS`
//! - `JOBWARDEN_RETRY_MAX_DELAY_MS`
//! - `JOBWARDEN_BATCH_MAX_CONCURRENCY`
//! - `JOBWARDEN_WORKER_CONCURRENCY`
//! - `JOBWARDEN_SOFT_TIME_LIMIT_SECS`
//! - `JOBWARDEN_HARD_TIME_LIMIT_SECS`
//! - `JOBWARDEN_RESULT_RETENTION_SECS`
//! - `JOBWARDEN_QUEUES`: comma-separated queue names
//! - `JOBWARDEN_MODEL`: dependency model identity
//! - `JOBWARDEN_ENDPOINT`: dependency endpoint URL
//! - `JOBWARDEN_LOG_LEVEL`
//! - `JOBWARDEN_LOG_JSON`: true/false
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.{json,toml}` and `./jobwarden.{json,toml}`
//! 2. The same names one and two directories up
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use jobwarden_domain::{Config, JobwardenError, Result};

const ENV_PREFIX: &str = "JOBWARDEN_";
const FILE_NAMES: [&str; 4] = ["config.json", "config.toml", "jobwarden.json", "jobwarden.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `JobwardenError::Config` if an environment variable or the
/// config file is invalid, or the result fails validation.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) if has_env_overrides() => Err(e),
        Err(e) => {
            tracing::debug!(error = ?e, "No environment configuration, trying file");
            match probe_config_paths() {
                Some(path) => load_from_file(Some(path)),
                None => {
                    tracing::info!("No config file found, using defaults");
                    let config = Config::default();
                    validate(&config)?;
                    Ok(config)
                }
            }
        }
    }
}

/// Load configuration from environment variables
///
/// Starts from the defaults and applies every `JOBWARDEN_*` variable that
/// is set.
///
/// # Errors
/// Returns `JobwardenError::Config` if no variable is set, a value cannot
/// be parsed, or the result fails validation.
pub fn load_from_env() -> Result<Config> {
    if !has_env_overrides() {
        return Err(JobwardenError::Config("No JOBWARDEN_* environment variables set".to_string()));
    }

    let mut config = Config::default();

    apply(&mut config.breaker.failure_threshold, "JOBWARDEN_BREAKER_FAILURE_THRESHOLD")?;
    apply(&mut config.breaker.recovery_timeout_secs, "JOBWARDEN_BREAKER_RECOVERY_TIMEOUT_SECS")?;
    apply(&mut config.breaker.success_threshold, "JOBWARDEN_BREAKER_SUCCESS_THRESHOLD")?;
    apply(&mut config.breaker.call_timeout_secs, "JOBWARDEN_BREAKER_CALL_TIMEOUT_SECS")?;

    apply(&mut config.retry.max_retries, "JOBWARDEN_MAX_RETRIES")?;
    apply(&mut config.retry.base_delay_ms, "JOBWARDEN_RETRY_BASE_DELAY_MS")?;
    apply(&mut config.retry.max_delay_ms, "JOBWARDEN_RETRY_MAX_DELAY_MS")?;

    apply(&mut config.batch.max_concurrency, "JOBWARDEN_BATCH_MAX_CONCURRENCY")?;
    apply(&mut config.batch.worker_concurrency, "JOBWARDEN_WORKER_CONCURRENCY")?;
    apply(&mut config.batch.soft_time_limit_secs, "JOBWARDEN_SOFT_TIME_LIMIT_SECS")?;
    apply(&mut config.batch.hard_time_limit_secs, "JOBWARDEN_HARD_TIME_LIMIT_SECS")?;
    apply(&mut config.batch.result_retention_secs, "JOBWARDEN_RESULT_RETENTION_SECS")?;

    if let Ok(queues) = std::env::var("JOBWARDEN_QUEUES") {
        config.queues.known =
            queues.split(',').map(str::trim).filter(|q| !q.is_empty()).map(ToString::to_string).collect();
    }

    apply(&mut config.dependency.model, "JOBWARDEN_MODEL")?;
    if let Ok(endpoint) = std::env::var("JOBWARDEN_ENDPOINT") {
        config.dependency.endpoint = Some(endpoint);
    }

    apply(&mut config.logging.level, "JOBWARDEN_LOG_LEVEL")?;
    config.logging.json = env_bool("JOBWARDEN_LOG_JSON", config.logging.json);

    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `JobwardenError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The configuration fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(JobwardenError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            JobwardenError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| JobwardenError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`). Missing
/// sections and fields fall back to their defaults.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| JobwardenError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| JobwardenError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(JobwardenError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| [root.clone(), root.join(".."), root.join("../..")])
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Reject configurations the runtime cannot operate with
///
/// # Errors
/// Returns `JobwardenError::Config` describing the first violated rule.
pub fn validate(config: &Config) -> Result<()> {
    let invalid = |message: &str| Err(JobwardenError::Config(message.to_string()));

    if config.breaker.failure_threshold == 0 {
        return invalid("breaker.failure_threshold must be at least 1");
    }
    if config.breaker.success_threshold == 0 {
        return invalid("breaker.success_threshold must be at least 1");
    }
    if config.breaker.call_timeout_secs == 0 {
        return invalid("breaker.call_timeout_secs must be at least 1");
    }
    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        return invalid("retry.base_delay_ms must not exceed retry.max_delay_ms");
    }
    if config.batch.max_concurrency == 0 || config.batch.worker_concurrency == 0 {
        return invalid("batch concurrency settings must be at least 1");
    }
    if config.batch.soft_time_limit_secs >= config.batch.hard_time_limit_secs {
        return invalid("batch.soft_time_limit_secs must be below batch.hard_time_limit_secs");
    }
    if config.queues.known.is_empty() {
        return invalid("queues.known must name at least one queue");
    }
    Ok(())
}

fn has_env_overrides() -> bool {
    std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX))
}

/// Overwrite `target` with the parsed variable, if it is set
fn apply<T>(target: &mut T, key: &str) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| JobwardenError::Config(format!("Invalid value for {key}: {e}")))?;
    }
    Ok(())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
