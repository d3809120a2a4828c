#![cfg(all(unix, not(target_arch = "wasm32")))]

//! Kept in its own test binary: it drives configuration through the process environment.

mod harness;

use harness::ReplayRuntime;
use tier_harness::{
    run_from_env, select_scenarios, HarnessConfig, SuiteReport, ENV_FILTER, ENV_REPORT_PATH,
};

#[tokio::test]
async fn environment_selects_runtime_scenarios_and_report_path() -> anyhow::Result<()> {
    let filter = "id:arity/sum7 id:exceptions/finally-count";
    let runtime = ReplayRuntime::new()?;
    let config = HarnessConfig {
        filter: Some(filter.to_string()),
        ..HarnessConfig::default()
    };
    let specs = select_scenarios(&config)?.into_scenarios();
    assert_eq!(specs.len(), 2);
    for spec in &specs {
        runtime.answer_faithfully(spec)?;
    }
    let report_path = runtime.path().join("out").join("report.json");

    std::env::set_var("TIERPROBE_SUT", runtime.script());
    std::env::remove_var("TIERPROBE_SUT_ARGS");
    std::env::set_var(ENV_FILTER, filter);
    std::env::set_var(ENV_REPORT_PATH, &report_path);

    let report = run_from_env().await?;
    assert!(report.is_success(), "{}", report.render());
    assert_eq!(report.suites.len(), 1);
    assert_eq!(report.suites[0].total_scenarios, 2);

    let written: serde_json::Value = serde_json::from_slice(&std::fs::read(&report_path)?)?;
    let suites: Vec<SuiteReport> = serde_json::from_value(written["suites"].clone())?;
    assert_eq!(suites[0].passed, 2);
    Ok(())
}
