//! Worker configuration
//!
//! Loaded once from the environment (and `.env`) at startup.

use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

/// Default per-request timeout for the execution service (in seconds)
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 30;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Judge0 submissions endpoint (e.g. https://judge0-ce.p.rapidapi.com/submissions)
    pub judge0_url: Option<String>,
    /// RapidAPI key for Judge0
    pub judge0_key: Option<String>,
    /// RapidAPI host header
    pub judge0_host: String,
    /// Upper bound on a single execution request
    pub execution_timeout: Duration,
    /// Language name looked up in languages.toml
    pub language: String,
    /// Optional path to an exercise catalog replacing the embedded one
    pub exercises_path: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".into(),
            judge0_url: None,
            judge0_key: None,
            judge0_host: "judge0-ce.p.rapidapi.com".into(),
            execution_timeout: Duration::from_secs(DEFAULT_EXECUTION_TIMEOUT_SECS),
            language: "csharp".into(),
            exercises_path: None,
        }
    }
}

impl EngineConfig {
    /// Build configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let execution_timeout = match non_empty("JUDGE0_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(
                        "Invalid JUDGE0_TIMEOUT_SECS={}, using {}s",
                        raw, DEFAULT_EXECUTION_TIMEOUT_SECS
                    );
                    defaults.execution_timeout
                }
            },
            None => defaults.execution_timeout,
        };

        Self {
            redis_url: non_empty("REDIS_URL").unwrap_or(defaults.redis_url),
            judge0_url: non_empty("JUDGE0_API_URL"),
            judge0_key: non_empty("JUDGE0_API_KEY"),
            judge0_host: non_empty("JUDGE0_API_HOST").unwrap_or(defaults.judge0_host),
            execution_timeout,
            language: non_empty("MP_LANGUAGE").unwrap_or(defaults.language),
            exercises_path: non_empty("EXERCISES_PATH"),
        }
    }

    /// Whether the execution service can be reached at all
    pub fn has_execution_service(&self) -> bool {
        self.judge0_url.is_some() && self.judge0_key.is_some()
    }
}

/// Global worker configuration
static ENGINE_CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Initialize the global configuration from the environment.
///
/// Called once by `main`; the returned reference is handed to the components that need it.
pub fn init_config() -> anyhow::Result<&'static EngineConfig> {
    ENGINE_CONFIG
        .set(EngineConfig::from_env())
        .map_err(|_| anyhow::anyhow!("Engine configuration already initialized"))?;

    ENGINE_CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("Engine configuration missing after initialization"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_config_runs_once() {
        let config = init_config().unwrap();
        assert!(!config.redis_url.is_empty());
        assert!(init_config().is_err());
    }

    #[test]
    fn test_default_config_has_no_service() {
        let config = EngineConfig::default();
        assert!(!config.has_execution_service());
        assert_eq!(config.execution_timeout, Duration::from_secs(30));
        assert_eq!(config.language, "csharp");
    }

    #[test]
    fn test_service_requires_url_and_key() {
        let config = EngineConfig {
            judge0_url: Some("https://judge0.example/submissions".into()),
            ..EngineConfig::default()
        };
        assert!(!config.has_execution_service());

        let config = EngineConfig {
            judge0_key: Some("key".into()),
            ..config
        };
        assert!(config.has_execution_service());
    }
}
