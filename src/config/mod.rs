//! Configuration module for reserved_dispatch.
//!
//! This module provides centralized configuration loading from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use reserved_dispatch::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Reserved threads: {}", config.reserved.capacity());
//! println!("Backing threads: {}", config.backing.threads());
//! ```

mod backing;
mod driver;
mod error;
mod logging;
mod parse;
mod reserved;

pub use backing::BackingConfig;
pub use driver::DriverConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use parse::parse_duration;
pub use reserved::{ReservedConfig, ReservedThreads};

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Reserved dispatcher configuration.
    pub reserved: ReservedConfig,
    /// Backing pool configuration.
    pub backing: BackingConfig,
    /// Load driver configuration.
    pub driver: DriverConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backing = BackingConfig::from_env()?;
        Ok(Self {
            reserved: ReservedConfig::from_env(backing.threads())?,
            backing,
            driver: DriverConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Backing threads: {}", self.backing.threads());
        info!("  Backing queue capacity: {}", self.backing.queue_capacity());

        if self.reserved.capacity() == 0 {
            info!("  Reserved threads: disabled");
        } else {
            info!(
                "  Reserved threads: {} ({:?})",
                self.reserved.capacity(),
                self.reserved.threads
            );
        }

        match self.reserved.idle_timeout {
            Some(timeout) => info!("  Idle timeout: {}ms", timeout.as_millis()),
            None => info!("  Idle timeout: disabled"),
        }

        info!(
            "  Stress: {} loops over {} chains",
            self.driver.loops, self.driver.chains
        );
    }
}
