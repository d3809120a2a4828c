use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::scenario::{Expectation, Family, ScenarioSpec};
use crate::verdict::{Verdict, VerdictKind};

const MAX_RENDERED_VALUE: usize = 120;

/// Collects verdicts of one suite, keyed by scenario, in the order scenarios were first seen.
#[derive(Debug)]
pub struct ResultAggregator {
    suite: String,
    tallies: Vec<Tally>,
    index: HashMap<String, usize>,
}

#[derive(Debug)]
struct Tally {
    id: String,
    family: Family,
    description: String,
    expectation: Expectation,
    checkpoints_total: usize,
    verdicts: Vec<Verdict>,
}

impl ResultAggregator {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            tallies: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Make sure `spec` appears in the report even if no verdict is ever recorded for it.
    pub fn register(&mut self, spec: &ScenarioSpec) {
        self.slot(spec);
    }

    pub fn record(&mut self, spec: &ScenarioSpec, verdict: Verdict) {
        let idx = self.slot(spec);
        self.tallies[idx].verdicts.push(verdict);
    }

    fn slot(&mut self, spec: &ScenarioSpec) -> usize {
        if let Some(&idx) = self.index.get(&spec.id) {
            return idx;
        }
        let idx = self.tallies.len();
        self.tallies.push(Tally {
            id: spec.id.clone(),
            family: spec.family,
            description: spec.description.clone(),
            expectation: spec.expectation,
            checkpoints_total: spec.checkpoints.len(),
            verdicts: Vec::new(),
        });
        self.index.insert(spec.id.clone(), idx);
        idx
    }

    pub fn finalize(self) -> SuiteReport {
        let scenarios: Vec<ScenarioOutcome> =
            self.tallies.into_iter().map(ScenarioOutcome::from_tally).collect();

        let mut verdict_counts: BTreeMap<String, usize> = VerdictKind::ALL
            .iter()
            .map(|k| (k.as_str().to_string(), 0))
            .collect();
        let mut checkpoint_counts = verdict_counts.clone();
        let mut passed = 0;
        let mut failed = 0;
        let mut advisory_failures = 0;
        for outcome in &scenarios {
            *verdict_counts.entry(outcome.overall.as_str().to_string()).or_insert(0) += 1;
            for verdict in &outcome.verdicts {
                *checkpoint_counts.entry(verdict.kind.as_str().to_string()).or_insert(0) += 1;
            }
            match (outcome.overall.is_pass(), outcome.expectation) {
                (true, _) => passed += 1,
                (false, Expectation::Strict) => failed += 1,
                (false, Expectation::Advisory) => advisory_failures += 1,
            }
        }

        SuiteReport {
            suite: self.suite,
            total_scenarios: scenarios.len(),
            passed,
            failed,
            advisory_failures,
            verdict_counts,
            checkpoint_counts,
            scenarios,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub id: String,
    pub family: Family,
    pub description: String,
    pub expectation: Expectation,
    /// Most severe verdict over all checkpoints.
    pub overall: VerdictKind,
    pub checkpoints_run: usize,
    pub checkpoints_total: usize,
    pub first_failure: Option<Verdict>,
    pub verdicts: Vec<Verdict>,
}

impl ScenarioOutcome {
    fn from_tally(mut tally: Tally) -> Self {
        if tally.verdicts.is_empty() {
            tally.verdicts.push(
                Verdict::new(VerdictKind::Crashed, "-").with_detail("no checkpoint was reported"),
            );
        }
        let overall = tally
            .verdicts
            .iter()
            .map(|v| v.kind)
            .max()
            .unwrap_or(VerdictKind::Pass);
        let first_failure = tally.verdicts.iter().find(|v| !v.kind.is_pass()).cloned();
        let checkpoints_run = tally
            .verdicts
            .iter()
            .filter(|v| v.kind != VerdictKind::Unstable)
            .count();
        Self {
            id: tally.id,
            family: tally.family,
            description: tally.description,
            expectation: tally.expectation,
            overall,
            checkpoints_run,
            checkpoints_total: tally.checkpoints_total,
            first_failure,
            verdicts: tally.verdicts,
        }
    }

    pub fn is_failure(&self) -> bool {
        !self.overall.is_pass()
    }

    /// First checkpoint at which the scenario's worst verdict occurred.
    pub fn decisive(&self) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.kind == self.overall)
    }
}

/// Finalized results of one suite (one SUT profile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub suite: String,
    pub total_scenarios: usize,
    pub passed: usize,
    /// Strict scenarios with a non-Pass overall verdict.
    pub failed: usize,
    pub advisory_failures: usize,
    /// Scenarios per overall verdict.
    pub verdict_counts: BTreeMap<String, usize>,
    /// Checkpoint verdicts per kind.
    pub checkpoint_counts: BTreeMap<String, usize>,
    pub scenarios: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn scenario(&self, id: &str) -> Option<&ScenarioOutcome> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "suite: {}", self.suite);
        let _ = writeln!(out, "total scenarios: {}", self.total_scenarios);
        let _ = writeln!(out, "passed: {}", self.passed);
        let _ = writeln!(out, "failed: {}", self.failed);
        if self.advisory_failures > 0 {
            let _ = writeln!(out, "advisory failures: {}", self.advisory_failures);
        }
        for kind in VerdictKind::ALL {
            let count = self.verdict_counts.get(kind.as_str()).copied().unwrap_or(0);
            let _ = writeln!(out, "{kind}: {count}");
        }
        for outcome in self.scenarios.iter().filter(|s| s.is_failure()) {
            let Some(verdict) = outcome.decisive() else {
                continue;
            };
            let expected = verdict.expected.as_deref().unwrap_or("-");
            let actual = verdict
                .actual
                .as_deref()
                .or(verdict.detail.as_deref())
                .unwrap_or("-");
            let _ = write!(
                out,
                "{} @ {}: {} expected={} actual={}",
                outcome.id,
                verdict.checkpoint,
                verdict.kind,
                single_line(expected),
                single_line(actual)
            );
            if outcome.expectation == Expectation::Advisory {
                out.push_str(" (advisory)");
            }
            out.push('\n');
        }
        out
    }

    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        write_json(self, path)
    }
}

/// Reports of suites that ran in parallel against different SUT profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombinedReport {
    pub suites: Vec<SuiteReport>,
}

impl CombinedReport {
    pub fn new(suites: Vec<SuiteReport>) -> Self {
        Self { suites }
    }

    pub fn is_success(&self) -> bool {
        self.suites.iter().all(SuiteReport::is_success)
    }

    pub fn exit_code(&self) -> u8 {
        self.suites.iter().map(SuiteReport::exit_code).max().unwrap_or(0)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, suite) in self.suites.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            out.push_str(&suite.render());
        }
        if self.suites.len() > 1 {
            let failed: usize = self.suites.iter().map(|s| s.failed).sum();
            let _ = writeln!(out, "\nsuites: {}, failed scenarios: {failed}", self.suites.len());
        }
        out
    }

    pub fn print_summary(&self) {
        print!("{}", self.render());
    }

    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        write_json(self, path)
    }
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, contents)
}

fn single_line(text: &str) -> String {
    let escaped = text.replace('\r', "\\r").replace('\n', "\\n");
    if escaped.chars().count() <= MAX_RENDERED_VALUE {
        return escaped;
    }
    let mut cut: String = escaped.chars().take(MAX_RENDERED_VALUE).collect();
    cut.push_str("...");
    cut
}
