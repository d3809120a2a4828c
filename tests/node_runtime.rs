#![cfg(all(unix, not(target_arch = "wasm32")))]

//! Runs the generated scenario sources on a real JavaScript engine, so a JS body and the oracle
//! computing its expected value cannot drift apart unnoticed.

mod harness;

use harness::node_binary;
use tier_harness::{
    run_suite, select_scenarios, Family, HarnessConfig, ProcessSut, SutConfig, VerdictKind,
};

const FAMILIES: [Family; 4] = [
    Family::Arity,
    Family::Polymorphic,
    Family::Exceptions,
    Family::Vectorized,
];

#[tokio::test(flavor = "multi_thread")]
async fn every_catalog_scenario_passes_on_node() -> anyhow::Result<()> {
    let Some(node) = node_binary() else {
        eprintln!("skipping: node not found (install Node.js or set TIERPROBE_NODE=...)");
        return Ok(());
    };

    let mut handles = Vec::new();
    for family in FAMILIES {
        let config = HarnessConfig {
            filter: Some(format!("family:{family}")),
            ..HarnessConfig::default()
        };
        let specs = select_scenarios(&config)?.into_scenarios();
        let mut sut = ProcessSut::new(SutConfig::new(&node))?;
        handles.push(tokio::spawn(async move {
            run_suite(&family.to_string(), &mut sut, &specs, &config).await
        }));
    }

    for handle in handles {
        let report = handle.await??;
        assert!(report.total_scenarios > 0, "{}", report.suite);
        assert_eq!(report.failed, 0, "{}", report.render());
        assert_eq!(report.passed, report.total_scenarios);
        assert!(report
            .scenarios
            .iter()
            .all(|s| s.verdicts.iter().all(|v| v.kind == VerdictKind::Pass)));
    }
    Ok(())
}
