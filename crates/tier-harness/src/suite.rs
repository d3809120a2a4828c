//! Suite runners: one SUT handle per suite, scenarios strictly in order, suites for different
//! SUT profiles side by side.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::ScenarioCatalog;
use crate::config::HarnessConfig;
use crate::driver::TierDriver;
use crate::error::{HarnessError, Result};
use crate::report::{CombinedReport, ResultAggregator, SuiteReport};
use crate::scenario::ScenarioSpec;
use crate::sut::{ProcessSut, Sut, SutConfig};
use crate::verdict::VerdictKind;

/// The standard catalog narrowed by the configured filter, with advisory marks applied.
pub fn select_scenarios(config: &HarnessConfig) -> Result<ScenarioCatalog> {
    let mut catalog = ScenarioCatalog::standard(&config.catalog)?;
    if let Some(filter) = &config.filter {
        catalog = catalog.filtered(filter)?;
    }
    if let Some(advisory) = &config.advisory {
        let marked = catalog.mark_advisory(advisory);
        if marked == 0 {
            warn!(%advisory, "advisory filter matched no scenario");
        }
    }
    Ok(catalog)
}

/// Run every scenario in order against `sut`. A Crashed or Timeout scenario is recorded and the
/// suite continues with the next one; harness errors abort the suite.
pub async fn run_suite<S: Sut>(
    name: &str,
    sut: &mut S,
    scenarios: &[ScenarioSpec],
    config: &HarnessConfig,
) -> Result<SuiteReport> {
    info!(
        suite = name,
        sut = sut.label(),
        scenarios = scenarios.len(),
        stability_runs = config.stability_runs,
        "starting suite"
    );
    let mut aggregator = ResultAggregator::new(name);
    let mut driver = TierDriver::new(sut, config);

    for spec in scenarios {
        aggregator.register(spec);
        let verdicts = driver.run_checked(spec, config.stability_runs).await?;
        let overall = verdicts
            .iter()
            .map(|v| v.kind)
            .max()
            .unwrap_or(VerdictKind::Crashed);
        info!(suite = name, scenario = %spec.id, verdict = %overall, "scenario finished");
        for verdict in verdicts {
            aggregator.record(spec, verdict);
        }
    }

    let report = aggregator.finalize();
    info!(
        suite = name,
        passed = report.passed,
        failed = report.failed,
        advisory_failures = report.advisory_failures,
        "suite finished"
    );
    Ok(report)
}

/// Run one suite per SUT, all concurrently, and combine the reports in the order given.
pub async fn run_suites<S>(
    suts: Vec<S>,
    scenarios: Arc<Vec<ScenarioSpec>>,
    config: Arc<HarnessConfig>,
) -> Result<CombinedReport>
where
    S: Sut + 'static,
{
    let mut handles = Vec::with_capacity(suts.len());
    for mut sut in suts {
        let name = sut.label().to_string();
        let scenarios = Arc::clone(&scenarios);
        let config = Arc::clone(&config);
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            run_suite(&task_name, &mut sut, &scenarios, &config).await
        });
        handles.push((name, handle));
    }

    let mut suites = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let report = handle.await.map_err(|e| HarnessError::SuiteAborted {
            suite: name,
            reason: e.to_string(),
        })??;
        suites.push(report);
    }
    Ok(CombinedReport::new(suites))
}

/// [`run_suites`] with a fresh process-backed SUT per profile.
pub async fn run_profiles(
    profiles: Vec<SutConfig>,
    scenarios: Arc<Vec<ScenarioSpec>>,
    config: Arc<HarnessConfig>,
) -> Result<CombinedReport> {
    let suts = profiles
        .into_iter()
        .map(ProcessSut::new)
        .collect::<Result<Vec<_>>>()?;
    run_suites(suts, scenarios, config).await
}
