//! Logging configuration.

use super::parse::{env_opt, env_or};
use super::ConfigError;

/// Filter target for this crate's own events.
const DEFAULT_TARGET: &str = "reserved_dispatch";

/// Output format for log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable tracing fmt output.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log level filter (from LOG_LEVEL or RUST_LOG).
    pub filter: String,
    /// Line format (from LOG_FORMAT).
    pub format: LogFormat,
    /// Service name for structured logging.
    pub service_name: String,
}

impl LoggingConfig {
    /// Filter precedence is `LOG_LEVEL`, then `RUST_LOG`, then
    /// `reserved_dispatch=info`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let filter = Self::resolve_log_filter();
        let format = match env_or("LOG_FORMAT", "text").to_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT".into(),
                    message: format!("expected text or json, got '{}'", other),
                })
            }
        };
        Ok(Self {
            filter,
            format,
            service_name: env_or("SERVICE_NAME", DEFAULT_TARGET),
        })
    }

    /// `LOG_LEVEL` names one level for this crate; `RUST_LOG` is a full
    /// filter directive. An unknown `LOG_LEVEL` is reported and skipped.
    fn resolve_log_filter() -> String {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        if let Some(level) = env_opt("LOG_LEVEL").map(|l| l.to_lowercase()) {
            if LEVELS.contains(&level.as_str()) {
                return format!("{}={}", DEFAULT_TARGET, level);
            }
            // The subscriber is not installed yet.
            eprintln!(
                "ignoring LOG_LEVEL '{}': expected one of {}",
                level,
                LEVELS.join(", ")
            );
        }

        env_opt("RUST_LOG").unwrap_or_else(|| format!("{}=info", DEFAULT_TARGET))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: format!("{}=info", DEFAULT_TARGET),
            format: LogFormat::Text,
            service_name: DEFAULT_TARGET.to_string(),
        }
    }
}
