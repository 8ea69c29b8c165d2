use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::model::config::Config;

/// File looked up in the working directory when no `--config` is given
pub const CONFIG_FILE: &str = "taskmd.toml";
/// Fallback in the home directory
pub const HOME_CONFIG_FILE: &str = ".taskmd.toml";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Resolve which config file applies: an explicit path, else `taskmd.toml`
/// in the working directory, else `~/.taskmd.toml`.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(HOME_CONFIG_FILE))
        .filter(|p| p.is_file())
}

/// Read a config file. Missing keys take their defaults.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load the effective configuration: file (if any), then environment overrides.
/// An explicit path that does not exist is an error; a missing default file is not.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match find_config_file(explicit) {
        Some(path) => read_config(&path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Apply `TASKS_DIR`, `LOG_LEVEL` and `AUTO_EVAL_*` overrides. Malformed values
/// are ignored with a warning.
pub fn apply_env_overrides(config: &mut Config, get: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = get("TASKS_DIR").filter(|v| !v.trim().is_empty()) {
        config.tasks_dir = PathBuf::from(dir);
    }
    if let Some(level) = get("LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
        config.log_level = level;
    }

    let eval = &mut config.evaluation;
    if let Some(v) = get("AUTO_EVAL_ENABLED") {
        match parse_bool(&v) {
            Some(b) => eval.enabled = b,
            None => warn!(key = "AUTO_EVAL_ENABLED", value = %v, "ignoring malformed override"),
        }
    }
    if let Some(v) = get("AUTO_EVAL_CACHE_TTL") {
        match parse_duration_secs(&v) {
            Some(secs) => eval.cache_ttl_secs = secs,
            None => warn!(key = "AUTO_EVAL_CACHE_TTL", value = %v, "ignoring malformed override"),
        }
    }
    if let Some(v) = get("AUTO_EVAL_MAX_CONCURRENT") {
        match v.trim().parse::<usize>() {
            Ok(n) => eval.max_concurrent = n,
            Err(_) => {
                warn!(key = "AUTO_EVAL_MAX_CONCURRENT", value = %v, "ignoring malformed override")
            }
        }
    }
    if let Some(v) = get("AUTO_EVAL_SKIP_READ_ONLY") {
        match parse_bool(&v) {
            Some(b) => eval.skip_read_only = b,
            None => {
                warn!(key = "AUTO_EVAL_SKIP_READ_ONLY", value = %v, "ignoring malformed override")
            }
        }
    }
    if let Some(v) = get("AUTO_EVAL_VERBOSE") {
        match parse_bool(&v) {
            Some(b) => eval.verbose_logging = b,
            None => warn!(key = "AUTO_EVAL_VERBOSE", value = %v, "ignoring malformed override"),
        }
    }
    eval.max_concurrent = eval.max_concurrent.max(1);
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Seconds, optionally suffixed with `s`, `m` or `h`
fn parse_duration_secs(s: &str) -> Option<u64> {
    let s = s.trim();
    let (digits, scale) = match s.char_indices().last()? {
        (i, 's') => (&s[..i], 1),
        (i, 'm') => (&s[..i], 60),
        (i, 'h') => (&s[..i], 3600),
        _ => (s, 1),
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(scale)
}
