//! Load driver configuration for the `reserved_dispatch` binary.

use super::parse::{env_bool, env_parse};
use super::ConfigError;

/// Settings for the self-re-dispatching load run.
#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// Total dispatches to perform (STRESS_LOOPS).
    pub loops: u64,
    /// Concurrent task chains seeded at start (STRESS_CHAINS).
    pub chains: usize,
    /// Print Prometheus metrics after the run (PRINT_METRICS).
    pub print_metrics: bool,
}

impl DriverConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let chains = env_parse("STRESS_CHAINS", 8usize)?;
        if chains == 0 {
            return Err(ConfigError::Invalid {
                key: "STRESS_CHAINS".into(),
                message: "at least one chain is required".into(),
            });
        }

        Ok(Self {
            loops: env_parse("STRESS_LOOPS", 100_000u64)?,
            chains,
            print_metrics: env_bool("PRINT_METRICS", false),
        })
    }
}
