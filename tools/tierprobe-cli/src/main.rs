#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tier_harness::{
    calibrate, parse_count, parse_timeout, parse_tolerance, run_profiles, select_scenarios,
    HarnessConfig, HarnessError, ProcessSut, Schedule, SutConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit status for harness failures (bad configuration, unreachable SUT, malformed output).
const HARNESS_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "tierprobe",
    about = "Drive a JIT runtime through its tier transitions and check every tier returns the same results."
)]
struct Args {
    /// Runtime binary (defaults to $TIERPROBE_SUT)
    #[arg(long, value_name = "PATH")]
    sut: Option<PathBuf>,

    /// Extra runtime flag placed before the probe script; repeatable
    #[arg(long = "sut-arg", value_name = "FLAG", allow_hyphen_values = true)]
    sut_args: Vec<String>,

    /// Run one suite per profile, in parallel: NAME=FLAG,FLAG,... appended to the base flags
    #[arg(long, value_name = "NAME=FLAGS")]
    profile: Vec<String>,

    /// Warm-up checkpoints, `name=count,...` in increasing order
    #[arg(long, value_name = "SCHEDULE", value_parser = schedule_arg)]
    schedule: Option<Schedule>,

    /// Relative tolerance for float results
    #[arg(long, value_name = "REL", value_parser = tolerance_arg)]
    tolerance: Option<f64>,

    /// Scalar results with longer text are classified as corrupted
    #[arg(long, value_name = "CHARS", value_parser = count_arg)]
    corruption_threshold: Option<usize>,

    /// Per-scenario deadline in seconds (fractions allowed)
    #[arg(long, value_name = "SECS", value_parser = timeout_arg)]
    timeout_secs: Option<Duration>,

    /// Number of arguments the target ABI passes in registers
    #[arg(long, value_name = "N", value_parser = count_arg)]
    register_limit: Option<usize>,

    /// Width in bytes of the runtime's vector chunk
    #[arg(long, value_name = "BYTES", value_parser = count_arg)]
    chunk_bytes: Option<usize>,

    /// Only run scenarios matching any term (substring of id or family; `id:` / `family:` prefixes)
    #[arg(long, value_name = "TERMS")]
    filter: Option<String>,

    /// Scenarios matching any term are reported but never fail the run
    #[arg(long, value_name = "TERMS")]
    advisory: Option<String>,

    /// Run each scenario this many times and report differing verdicts as Unstable
    #[arg(long, value_name = "N", value_parser = count_arg)]
    stability_runs: Option<usize>,

    /// Write the structured report to this path
    #[arg(long, value_name = "PATH")]
    report_json: Option<PathBuf>,

    /// Print the selected scenarios and exit without running anything
    #[arg(long, action = clap::ArgAction::SetTrue)]
    list: bool,

    /// Derive the warm-up schedule from a timing probe before running the suites
    #[arg(long, action = clap::ArgAction::SetTrue)]
    calibrate: bool,
}

fn schedule_arg(s: &str) -> Result<Schedule, HarnessError> {
    Schedule::parse(s)
}

fn tolerance_arg(s: &str) -> Result<f64, HarnessError> {
    parse_tolerance("--tolerance", s)
}

fn timeout_arg(s: &str) -> Result<Duration, HarnessError> {
    parse_timeout("--timeout-secs", s)
}

fn count_arg(s: &str) -> Result<usize, HarnessError> {
    parse_count("value", s)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("tierprobe: {err:#}");
            ExitCode::from(HARNESS_ERROR)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<u8> {
    let mut config = HarnessConfig::from_env().context("read TIERPROBE_* configuration")?;
    apply_overrides(&mut config, &args)?;

    if args.list {
        let catalog = select_scenarios(&config)?;
        for spec in catalog.all_scenarios() {
            println!("{}\t{}\t{}", spec.id, spec.family, spec.description);
        }
        return Ok(0);
    }

    let base = match &args.sut {
        Some(program) => SutConfig::new(program),
        None => SutConfig::from_env()?,
    }
    .with_args(args.sut_args.iter().cloned());
    let profiles = if args.profile.is_empty() {
        vec![base]
    } else {
        args.profile
            .iter()
            .map(|p| base.profile(p))
            .collect::<Result<Vec<_>, _>>()?
    };

    if args.calibrate {
        let mut sut = ProcessSut::new(profiles[0].clone())?;
        if let Some(schedule) = calibrate(&mut sut, config.scenario_timeout).await? {
            config.catalog.schedule = schedule;
        }
    }

    let scenarios = select_scenarios(&config)?.into_scenarios();
    info!(
        scenarios = scenarios.len(),
        profiles = ?profiles.iter().map(|p| p.label.as_str()).collect::<Vec<_>>(),
        "running suites"
    );
    let report = run_profiles(profiles, Arc::new(scenarios), Arc::new(config)).await?;

    report.print_summary();
    if let Some(path) = &args.report_json {
        report
            .write_json(path)
            .with_context(|| format!("write report {}", path.display()))?;
    }
    Ok(report.exit_code())
}

fn apply_overrides(config: &mut HarnessConfig, args: &Args) -> anyhow::Result<()> {
    if let Some(schedule) = &args.schedule {
        config.catalog.schedule = schedule.clone();
    }
    if let Some(tolerance) = args.tolerance {
        config.float_tolerance = tolerance;
    }
    if let Some(threshold) = args.corruption_threshold {
        config.corruption_threshold = threshold;
    }
    if let Some(timeout) = args.timeout_secs {
        config.scenario_timeout = timeout;
    }
    if let Some(limit) = args.register_limit {
        config.catalog.register_arg_limit = limit;
    }
    if let Some(bytes) = args.chunk_bytes {
        config.catalog.vector_chunk_bytes = bytes;
    }
    if let Some(runs) = args.stability_runs {
        config.stability_runs = u32::try_from(runs).context("--stability-runs is too large")?;
    }
    if args.filter.is_some() {
        config.filter.clone_from(&args.filter);
    }
    if args.advisory.is_some() {
        config.advisory.clone_from(&args.advisory);
    }
    config.validate()?;
    Ok(())
}
