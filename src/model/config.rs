use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration from taskmd.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tasks_dir: default_tasks_dir(),
            log_level: default_log_level(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

/// Settings for the auto-evaluation middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache time-to-live, also the period of the expiry sweep
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Size of the evaluation semaphore; at least 1
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Bypass evaluation for read-only operations
    #[serde(default = "default_true")]
    pub skip_read_only: bool,
    /// Log evaluation failures instead of dropping them silently
    #[serde(default)]
    pub verbose_logging: bool,
}

impl EvaluationConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            enabled: true,
            cache_ttl_secs: default_cache_ttl_secs(),
            max_concurrent: default_max_concurrent(),
            skip_read_only: true,
            verbose_logging: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tasks_dir() -> PathBuf {
    PathBuf::from("./tasks")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Five minutes
fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_max_concurrent() -> usize {
    3
}
