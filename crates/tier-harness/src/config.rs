//! Harness configuration, with environment overrides.

use std::time::Duration;

use crate::catalog::CatalogConfig;
use crate::corruption::DEFAULT_LENGTH_THRESHOLD;
use crate::driver::DEFAULT_SCENARIO_TIMEOUT;
use crate::error::{HarnessError, Result};
use crate::oracle::DEFAULT_FLOAT_TOLERANCE;
use crate::schedule::Schedule;

pub const ENV_SCHEDULE: &str = "TIERPROBE_SCHEDULE";
pub const ENV_FLOAT_TOLERANCE: &str = "TIERPROBE_FLOAT_TOLERANCE";
pub const ENV_CORRUPTION_THRESHOLD: &str = "TIERPROBE_CORRUPTION_THRESHOLD";
pub const ENV_TIMEOUT_SECS: &str = "TIERPROBE_TIMEOUT_SECS";
pub const ENV_REGISTER_ARG_LIMIT: &str = "TIERPROBE_REGISTER_ARG_LIMIT";
pub const ENV_CHUNK_BYTES: &str = "TIERPROBE_CHUNK_BYTES";
pub const ENV_STABILITY_RUNS: &str = "TIERPROBE_STABILITY_RUNS";
pub const ENV_FILTER: &str = "TIERPROBE_FILTER";
pub const ENV_ADVISORY: &str = "TIERPROBE_ADVISORY";

pub(crate) const MAX_REGISTER_ARG_LIMIT: usize = 64;
const MAX_CHUNK_BYTES: usize = 4096;

#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub catalog: CatalogConfig,
    pub float_tolerance: f64,
    pub corruption_threshold: usize,
    pub scenario_timeout: Duration,
    /// How many times each scenario is run; verdict sequences that differ are reported Unstable.
    pub stability_runs: u32,
    /// Scenario selection, see [`crate::ScenarioCatalog::filtered`].
    pub filter: Option<String>,
    /// Scenarios matching this filter are reported but never fail the run.
    pub advisory: Option<String>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            float_tolerance: DEFAULT_FLOAT_TOLERANCE,
            corruption_threshold: DEFAULT_LENGTH_THRESHOLD,
            scenario_timeout: DEFAULT_SCENARIO_TIMEOUT,
            stability_runs: 1,
            filter: None,
            advisory: None,
        }
    }
}

impl HarnessConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whichever `TIERPROBE_*` keys `lookup` returns. Empty values are
    /// treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(v) = var(ENV_SCHEDULE) {
            config.catalog.schedule = Schedule::parse(&v)?;
        }
        if let Some(v) = var(ENV_FLOAT_TOLERANCE) {
            config.float_tolerance = parse_tolerance(ENV_FLOAT_TOLERANCE, &v)?;
        }
        if let Some(v) = var(ENV_CORRUPTION_THRESHOLD) {
            config.corruption_threshold = parse_count(ENV_CORRUPTION_THRESHOLD, &v)?;
        }
        if let Some(v) = var(ENV_TIMEOUT_SECS) {
            config.scenario_timeout = parse_timeout(ENV_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = var(ENV_REGISTER_ARG_LIMIT) {
            config.catalog.register_arg_limit = parse_count(ENV_REGISTER_ARG_LIMIT, &v)?;
        }
        if let Some(v) = var(ENV_CHUNK_BYTES) {
            config.catalog.vector_chunk_bytes = parse_count(ENV_CHUNK_BYTES, &v)?;
        }
        if let Some(v) = var(ENV_STABILITY_RUNS) {
            let runs = parse_count(ENV_STABILITY_RUNS, &v)?;
            config.stability_runs = u32::try_from(runs).map_err(|_| {
                HarnessError::InvalidConfig(format!("{ENV_STABILITY_RUNS}={v:?} is too large"))
            })?;
        }
        config.filter = var(ENV_FILTER);
        config.advisory = var(ENV_ADVISORY);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.float_tolerance.is_finite() && self.float_tolerance >= 0.0) {
            return Err(HarnessError::InvalidConfig(format!(
                "float tolerance must be a finite non-negative number, got {}",
                self.float_tolerance
            )));
        }
        if self.corruption_threshold == 0 {
            return Err(HarnessError::InvalidConfig(
                "corruption length threshold must be positive".into(),
            ));
        }
        if self.scenario_timeout.is_zero() {
            return Err(HarnessError::InvalidConfig("scenario timeout must be positive".into()));
        }
        if self.stability_runs == 0 {
            return Err(HarnessError::InvalidConfig("stability runs must be at least 1".into()));
        }
        if !(1..=MAX_REGISTER_ARG_LIMIT).contains(&self.catalog.register_arg_limit) {
            return Err(HarnessError::InvalidConfig(format!(
                "register argument limit must be in 1..={MAX_REGISTER_ARG_LIMIT}, got {}",
                self.catalog.register_arg_limit
            )));
        }
        if !(1..=MAX_CHUNK_BYTES).contains(&self.catalog.vector_chunk_bytes) {
            return Err(HarnessError::InvalidConfig(format!(
                "vector chunk width must be in 1..={MAX_CHUNK_BYTES} bytes, got {}",
                self.catalog.vector_chunk_bytes
            )));
        }
        Ok(())
    }
}

/// Positive integer; `_` separators allowed (`5_000`).
pub fn parse_count(key: &str, input: &str) -> Result<usize> {
    let cleaned: String = input.trim().chars().filter(|c| *c != '_').collect();
    match cleaned.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(HarnessError::InvalidConfig(format!(
            "{key}={input:?} is not a positive integer"
        ))),
    }
}

pub fn parse_tolerance(key: &str, input: &str) -> Result<f64> {
    match input.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(HarnessError::InvalidConfig(format!(
            "{key}={input:?} is not a finite non-negative number"
        ))),
    }
}

/// Seconds, fractional allowed (`0.5`).
pub fn parse_timeout(key: &str, input: &str) -> Result<Duration> {
    match input.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Ok(Duration::from_secs_f64(secs)),
        _ => Err(HarnessError::InvalidConfig(format!(
            "{key}={input:?} is not a positive number of seconds"
        ))),
    }
}
