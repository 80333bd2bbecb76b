use crate::error::{FilterError, Result};
use crate::hash::{HashFunction, default_hash_function};
use derive_builder::Builder;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for [`crate::FilterCacheManager`]
#[derive(Clone, Debug, Builder)]
#[builder(pattern = "owned")]
pub struct FilterManagerConfig {
    /// Target false positive rate of every batch membership
    #[builder(default = "0.01")]
    pub false_positive_rate: f64,

    /// Pause between two scheduled refreshes
    #[builder(default = "Duration::from_secs(1)")]
    pub refresh_interval: Duration,

    /// Wait before the first scheduled refresh
    #[builder(default = "Duration::from_secs(2)")]
    pub initial_delay: Duration,

    /// Subtracted from "now" when recording how far the cache is known to
    /// be complete, to absorb replication lag behind the ingestion writer.
    #[builder(default = "Duration::ZERO")]
    pub replica_delay: Duration,

    /// Merge adjacent filters of the same loaded file when possible
    #[builder(default = "true")]
    pub compact_filters: bool,

    /// Hash function used for every batch membership
    #[builder(default = "default_hash_function")]
    pub hash_function: HashFunction,
}

impl Default for FilterManagerConfig {
    fn default() -> Self {
        Self {
            false_positive_rate: 0.01,
            refresh_interval: Duration::from_secs(1),
            initial_delay: Duration::from_secs(2),
            replica_delay: Duration::ZERO,
            compact_filters: true,
            hash_function: default_hash_function,
        }
    }
}

impl FilterManagerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.false_positive_rate > 0.0 && self.false_positive_rate < 1.0) {
            return Err(FilterError::InvalidConfig(format!(
                "False positive rate must be between 0 and 1, got {}",
                self.false_positive_rate
            )));
        }
        if self.refresh_interval.is_zero() {
            return Err(FilterError::InvalidConfig(
                "Refresh interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Reads overrides from the environment (and a `.env` file if present),
    /// falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`FilterManagerConfig::from_env`], reading variables
    /// through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            false_positive_rate: env_or(
                &lookup,
                "FILTER_FALSE_POSITIVE_RATE",
                defaults.false_positive_rate,
            )?,
            refresh_interval: Duration::from_millis(env_or(
                &lookup,
                "FILTER_REFRESH_INTERVAL_MS",
                defaults.refresh_interval.as_millis() as u64,
            )?),
            initial_delay: Duration::from_millis(env_or(
                &lookup,
                "FILTER_INITIAL_DELAY_MS",
                defaults.initial_delay.as_millis() as u64,
            )?),
            replica_delay: Duration::from_millis(env_or(
                &lookup,
                "FILTER_REPLICA_DELAY_MS",
                defaults.replica_delay.as_millis() as u64,
            )?),
            compact_filters: env_or(
                &lookup,
                "FILTER_COMPACT_FILTERS",
                defaults.compact_filters,
            )?,
            hash_function: defaults.hash_function,
        };
        config.validate()?;
        Ok(config)
    }
}

fn env_or<F, T>(lookup: &F, var_name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var_name) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            FilterError::EnvParseError {
                var_name: var_name.to_string(),
                value: value.clone(),
                error: e.to_string(),
            }
        }),
        None => Ok(default),
    }
}
