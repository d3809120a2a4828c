//! Tier-correctness harness for JIT-compiling JavaScript runtimes.
//!
//! A runtime under test (the SUT) is treated as an opaque process: it is handed a generated probe
//! script, runs it, and reports results through sentinel lines on stdout. Each scenario warms a
//! small function up through a schedule of call counts chosen to cross the runtime's tier
//! thresholds, and the result sampled at every checkpoint is compared against a pure oracle.
//! Mismatches are classified (wrong value, corruption, crash, timeout, instability) and folded into
//! a [`SuiteReport`].
//!
//! Scenario families:
//! - **arity**: parameter counts around the register-argument limit
//! - **polymorphic**: typed-array functions re-invoked with new element types after warm-up
//! - **exceptions**: throw/finally unwinding across compiled frames
//! - **vectorized**: typed-array builtins at lengths around one vector chunk
//!
//! ## Environment variables
//!
//! [`HarnessConfig::from_env`] and [`run_from_env`] recognise:
//!
//! - `TIERPROBE_SUT` (required for [`run_from_env`]): path of the runtime binary.
//! - `TIERPROBE_SUT_ARGS` (optional): extra runtime flags, whitespace-separated.
//! - `TIERPROBE_SCHEDULE` (default: `interpreted=10,warm=100,simple-jit=500,full-jit=2000,full-jit-steady=5000`)
//! - `TIERPROBE_FLOAT_TOLERANCE` (default: `1e-4`): relative tolerance for float results.
//! - `TIERPROBE_CORRUPTION_THRESHOLD` (default: `50`): scalar results whose text is longer than
//!   this are treated as corrupted.
//! - `TIERPROBE_TIMEOUT_SECS` (default: `30`): per-scenario deadline.
//! - `TIERPROBE_REGISTER_ARG_LIMIT` (default: `6`), `TIERPROBE_CHUNK_BYTES` (default: `16`).
//! - `TIERPROBE_STABILITY_RUNS` (default: `1`).
//! - `TIERPROBE_FILTER`, `TIERPROBE_ADVISORY` (optional): scenario selectors, see
//!   [`ScenarioCatalog::filtered`].
//! - `TIERPROBE_REPORT_PATH` (optional): write the JSON report to this path.

mod calibrate;
mod catalog;
mod config;
mod corruption;
mod driver;
mod error;
mod oracle;
mod report;
mod scenario;
mod schedule;
mod suite;
mod value;
mod verdict;

pub mod probe;
pub mod sentinel;
pub mod sut;

use std::path::PathBuf;
use std::sync::Arc;

pub use calibrate::{
    calibrate, calibration_script, schedule_from_samples, CALIBRATION_ID,
    DEFAULT_CALIBRATION_ITERATIONS,
};
pub use catalog::{CatalogConfig, ScenarioCatalog};
pub use config::{
    parse_count, parse_timeout, parse_tolerance, HarnessConfig, ENV_ADVISORY, ENV_CHUNK_BYTES,
    ENV_CORRUPTION_THRESHOLD, ENV_FILTER, ENV_FLOAT_TOLERANCE, ENV_REGISTER_ARG_LIMIT,
    ENV_SCHEDULE, ENV_STABILITY_RUNS, ENV_TIMEOUT_SECS,
};
pub use corruption::{CorruptionDetector, CorruptionSignal, DEFAULT_LENGTH_THRESHOLD};
pub use driver::{TierDriver, DEFAULT_SCENARIO_TIMEOUT};
pub use error::{HarnessError, Result};
pub use oracle::{CompareOptions, OracleComparator, DEFAULT_FLOAT_TOLERANCE};
pub use report::{CombinedReport, ResultAggregator, ScenarioOutcome, SuiteReport};
pub use scenario::{Expectation, Family, Invocation, Oracle, ScenarioBuilder, ScenarioSpec};
pub use schedule::{Schedule, TierCheckpoint, DEFAULT_CHECKPOINTS};
pub use suite::{run_profiles, run_suite, run_suites, select_scenarios};
pub use sut::{ProcessSut, Sut, SutConfig};
pub use value::{number_text, ElementType, ParamKind, ResultKind, Value};
pub use verdict::{Verdict, VerdictKind};

pub const ENV_REPORT_PATH: &str = "TIERPROBE_REPORT_PATH";

/// Run the selected scenarios against the runtime named by `TIERPROBE_SUT` and print the summary.
pub async fn run_from_env() -> Result<CombinedReport> {
    let sut = SutConfig::from_env()?;
    let config = HarnessConfig::from_env()?;
    let scenarios = select_scenarios(&config)?.into_scenarios();
    let report = run_profiles(vec![sut], Arc::new(scenarios), Arc::new(config)).await?;

    if let Some(path) = std::env::var_os(ENV_REPORT_PATH).map(PathBuf::from) {
        report.write_json(&path)?;
    }
    report.print_summary();
    Ok(report)
}
