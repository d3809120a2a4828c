#![cfg(all(unix, not(target_arch = "wasm32")))]

mod harness;

use std::sync::Arc;

use harness::ReplayRuntime;
use tier_harness::{
    run_profiles, run_suite, select_scenarios, HarnessConfig, HarnessError, ProcessSut,
    ScenarioSpec, Value, VerdictKind,
};

fn selected(filter: &str) -> (HarnessConfig, Vec<ScenarioSpec>) {
    let config = HarnessConfig {
        filter: Some(filter.to_string()),
        ..HarnessConfig::default()
    };
    let specs = select_scenarios(&config).unwrap().into_scenarios();
    (config, specs)
}

#[tokio::test]
async fn faithful_runtime_passes_through_real_processes() -> anyhow::Result<()> {
    let (config, specs) = selected("family:exceptions id:arity/sum7 id:polymorphic/read");
    let runtime = ReplayRuntime::new()?;
    for spec in &specs {
        runtime.answer_faithfully(spec)?;
    }

    let report = run_profiles(
        vec![runtime.sut_config()],
        Arc::new(specs.clone()),
        Arc::new(config),
    )
    .await?;
    let suite = &report.suites[0];
    assert_eq!(suite.suite, "runtime.sh");
    assert_eq!(suite.total_scenarios, specs.len());
    assert_eq!(suite.failed, 0, "{}", suite.render());
    assert_eq!(report.exit_code(), 0);
    Ok(())
}

#[tokio::test]
async fn corruption_and_crash_are_isolated_to_their_scenarios() -> anyhow::Result<()> {
    let (config, specs) = selected("id:arity/sum7 id:arity/probe7 id:exceptions/rethrow");
    let runtime = ReplayRuntime::new()?;
    for spec in &specs {
        match spec.id.as_str() {
            "arity/sum7" => runtime.answer_with(spec, |idx, expected| {
                if idx >= 3 {
                    Value::str("function sum7(p1, p2, p3, p4, p5, p6, p7) {\n  return p1 + p2;\n}")
                } else {
                    expected
                }
            })?,
            "exceptions/rethrow" => runtime.forget(spec)?,
            _ => runtime.answer_faithfully(spec)?,
        }
    }

    let mut sut = ProcessSut::new(runtime.sut_config())?;
    let report = run_suite("jit", &mut sut, &specs, &config).await?;

    let sum7 = report.scenario("arity/sum7").unwrap();
    assert_eq!(sum7.overall, VerdictKind::Corrupted);
    let first = sum7.first_failure.as_ref().unwrap();
    assert_eq!(first.checkpoint, "full-jit");
    assert!(first.actual.as_deref().unwrap().starts_with("function sum7("));

    let rethrow = report.scenario("exceptions/rethrow").unwrap();
    assert_eq!(rethrow.overall, VerdictKind::Crashed);
    let detail = rethrow.verdicts[0].detail.as_deref().unwrap();
    assert!(detail.contains("exit code 3"), "{detail}");
    assert!(detail.contains("no answers for exceptions_rethrow"), "{detail}");

    assert_eq!(report.scenario("arity/probe7").unwrap().overall, VerdictKind::Pass);
    assert_eq!(report.failed, 2);
    assert_eq!(sut.resets(), 1);

    let rendered = report.render();
    assert!(rendered.contains("arity/sum7 @ full-jit: Corrupted expected=28 actual=function sum7("));
    assert!(rendered.contains("exceptions/rethrow @ interpreted: Crashed expected=- actual=SUT ended"));
    Ok(())
}

#[tokio::test]
async fn garbled_sentinel_aborts_the_suite() -> anyhow::Result<()> {
    let (config, specs) = selected("id:arity/sum7");
    let runtime = ReplayRuntime::new()?;
    std::fs::write(
        runtime.path().join("answers/arity_sum7.out"),
        "CHECKPOINT:interpreted\nRESULT:number:28\n",
    )?;
    let mut sut = ProcessSut::new(runtime.sut_config())?;
    let err = run_suite("jit", &mut sut, &specs, &config).await.unwrap_err();
    assert!(matches!(err, HarnessError::MalformedSentinel { .. }), "{err}");
    assert_eq!(err.exit_code(), 2);
    Ok(())
}

#[tokio::test]
async fn json_report_lists_every_scenario() -> anyhow::Result<()> {
    let (config, specs) = selected("family:exceptions");
    let runtime = ReplayRuntime::new()?;
    for spec in &specs {
        runtime.answer_faithfully(spec)?;
    }
    let report = run_profiles(vec![runtime.sut_config()], Arc::new(specs.clone()), Arc::new(config)).await?;
    let path = runtime.path().join("reports/combined.json");
    report.write_json(&path)?;

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    let scenarios = json["suites"][0]["scenarios"].as_array().unwrap();
    assert_eq!(scenarios.len(), specs.len());
    assert!(scenarios.iter().all(|s| s["overall"] == "Pass"));
    assert_eq!(json["suites"][0]["verdict_counts"]["Pass"], specs.len());
    Ok(())
}
