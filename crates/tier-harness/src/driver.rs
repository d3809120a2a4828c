//! Runs one scenario against a SUT and classifies every checkpoint.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::config::HarnessConfig;
use crate::corruption::CorruptionDetector;
use crate::error::{HarnessError, Result};
use crate::oracle::{CompareOptions, OracleComparator};
use crate::probe::ProbeScript;
use crate::scenario::ScenarioSpec;
use crate::schedule::TierCheckpoint;
use crate::sentinel::Sentinel;
use crate::sut::{Execution, ExitOutcome, Sut};
use crate::value::Value;
use crate::verdict::{Verdict, VerdictKind};

pub const DEFAULT_SCENARIO_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives scenarios through their warm-up schedules on one SUT, strictly one at a time.
pub struct TierDriver<'s, S> {
    sut: &'s mut S,
    comparator: OracleComparator,
    detector: CorruptionDetector,
    timeout: Duration,
}

impl<'s, S: Sut> TierDriver<'s, S> {
    pub fn new(sut: &'s mut S, config: &HarnessConfig) -> Self {
        Self {
            sut,
            comparator: OracleComparator::new(config.float_tolerance),
            detector: CorruptionDetector::new(config.corruption_threshold),
            timeout: config.scenario_timeout,
        }
    }

    /// Warm the scenario up through every checkpoint and return one verdict per checkpoint
    /// reached. A Crashed or Timeout verdict ends the list early and the SUT is reset before
    /// returning.
    pub async fn run(&mut self, spec: &ScenarioSpec) -> Result<Vec<Verdict>> {
        spec.validate()?;
        let probe = ProbeScript::for_scenario(spec);
        debug!(
            scenario = %spec.id,
            checkpoints = spec.checkpoints.len(),
            warmup = spec.warmup_iterations(),
            "running scenario"
        );

        let execution = self.sut.execute(&probe, self.timeout).await?;
        let verdicts = self.classify(spec, &execution)?;

        if verdicts.last().is_some_and(|v| v.kind.aborts_scenario()) {
            self.sut.reset().await?;
        }
        Ok(verdicts)
    }

    /// Like [`TierDriver::run`], repeated `runs` times. When the sequence of verdict kinds differs
    /// between runs, the first run's verdicts are returned followed by an Unstable verdict.
    pub async fn run_checked(&mut self, spec: &ScenarioSpec, runs: u32) -> Result<Vec<Verdict>> {
        let mut first = self.run(spec).await?;
        for attempt in 2..=runs {
            let again = self.run(spec).await?;
            if let Some(idx) = first_divergence(&first, &again) {
                let checkpoint = first
                    .get(idx)
                    .or_else(|| again.get(idx))
                    .map(|v| v.checkpoint.clone())
                    .unwrap_or_default();
                warn!(scenario = %spec.id, %checkpoint, attempt, "verdicts differ between runs");
                let unstable = Verdict::new(VerdictKind::Unstable, checkpoint).with_detail(format!(
                    "run 1: [{}]; run {attempt}: [{}]",
                    kinds(&first),
                    kinds(&again)
                ));
                first.push(unstable);
                return Ok(first);
            }
        }
        Ok(first)
    }

    fn classify(&self, spec: &ScenarioSpec, execution: &Execution) -> Result<Vec<Verdict>> {
        let mut events = execution
            .sentinels
            .iter()
            .filter(|s| !matches!(s, Sentinel::Chatter(_)));
        let mut verdicts = Vec::with_capacity(spec.checkpoints.len());

        for cp in &spec.checkpoints {
            match events.next() {
                Some(Sentinel::Checkpoint(name)) => {
                    if name != &cp.name {
                        return Err(order_error(spec, cp, name));
                    }
                    match events.next() {
                        Some(Sentinel::Result { value, raw }) => {
                            verdicts.push(self.judge(spec, cp, value, raw));
                        }
                        None => {
                            verdicts.push(self.missing(spec, cp, execution));
                            return Ok(verdicts);
                        }
                        Some(other) => return Err(order_error(spec, cp, &describe(other))),
                    }
                }
                Some(Sentinel::Fault {
                    checkpoint,
                    message,
                }) => {
                    if checkpoint != &cp.name {
                        return Err(order_error(spec, cp, checkpoint));
                    }
                    warn!(scenario = %spec.id, checkpoint = %cp.name, %message, "scenario threw");
                    verdicts.push(
                        Verdict::new(VerdictKind::Crashed, &cp.name)
                            .with_detail(format!("uncaught exception: {}", first_line(message)))
                            .with_raw(message.clone()),
                    );
                    return Ok(verdicts);
                }
                None => {
                    verdicts.push(self.missing(spec, cp, execution));
                    return Ok(verdicts);
                }
                Some(other) => return Err(order_error(spec, cp, &describe(other))),
            }
        }

        match events.next() {
            Some(Sentinel::Done) => {}
            None => warn!(
                scenario = %spec.id,
                outcome = %execution.outcome,
                "all checkpoints reported but DONE missing"
            ),
            Some(other) => {
                return Err(HarnessError::SentinelOrder {
                    scenario: spec.id.clone(),
                    expected: "DONE".to_string(),
                    actual: describe(other),
                })
            }
        }
        if !execution.outcome.is_clean() {
            warn!(scenario = %spec.id, outcome = %execution.outcome, "SUT exited uncleanly after DONE");
        }
        Ok(verdicts)
    }

    fn judge(&self, spec: &ScenarioSpec, cp: &TierCheckpoint, actual: &Value, raw: &str) -> Verdict {
        let expected = spec.expected_at(cp);
        let opts = CompareOptions {
            kind: spec.result_kind,
            zero_sign: spec.zero_sign,
        };
        let mut verdict = Verdict::new(self.comparator.compare(actual, &expected, opts), &cp.name)
            .with_values(expected.text(), actual.text())
            .with_raw(raw);

        debug!(scenario = %spec.id, checkpoint = %cp.name, actual = %actual, "sampled");
        if verdict.kind == VerdictKind::WrongValue {
            if let Some(signal) = self.detector.inspect(actual, spec.result_kind) {
                verdict.kind = VerdictKind::Corrupted;
                verdict.detail = Some(signal.to_string());
                error!(
                    scenario = %spec.id,
                    checkpoint = %cp.name,
                    severity = "high",
                    %signal,
                    "corrupted result: argument slot aliasing suspected"
                );
                return verdict;
            }
            warn!(
                scenario = %spec.id,
                checkpoint = %cp.name,
                expected = %expected,
                actual = %actual,
                "wrong value"
            );
        }
        verdict
    }

    fn missing(&self, spec: &ScenarioSpec, cp: &TierCheckpoint, execution: &Execution) -> Verdict {
        let verdict = match execution.outcome {
            ExitOutcome::TimedOut => Verdict::new(VerdictKind::Timeout, &cp.name)
                .with_detail(format!("no result within {:?}", self.timeout)),
            outcome => {
                let mut detail = format!("SUT ended ({outcome}) before reporting");
                let tail = execution.stderr_tail.trim();
                if !tail.is_empty() {
                    detail.push_str("; stderr: ");
                    detail.push_str(last_line(tail));
                }
                Verdict::new(VerdictKind::Crashed, &cp.name).with_detail(detail)
            }
        };
        warn!(
            scenario = %spec.id,
            checkpoint = %cp.name,
            verdict = %verdict.kind,
            detail = verdict.detail.as_deref().unwrap_or_default(),
            "scenario aborted"
        );
        verdict
    }
}

fn order_error(spec: &ScenarioSpec, cp: &TierCheckpoint, actual: &str) -> HarnessError {
    HarnessError::SentinelOrder {
        scenario: spec.id.clone(),
        expected: cp.name.clone(),
        actual: actual.to_string(),
    }
}

fn describe(sentinel: &Sentinel) -> String {
    match sentinel {
        Sentinel::Checkpoint(name) => format!("CHECKPOINT:{name}"),
        Sentinel::Result { raw, .. } => format!("RESULT {raw:?}"),
        Sentinel::Fault { checkpoint, .. } => format!("FAULT:{checkpoint}"),
        Sentinel::Sample { iterations, .. } => format!("SAMPLE:{iterations}"),
        Sentinel::Done => "DONE".to_string(),
        Sentinel::Chatter(text) => text.clone(),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

fn last_line(text: &str) -> &str {
    text.lines().last().unwrap_or(text)
}

fn kinds(verdicts: &[Verdict]) -> String {
    verdicts
        .iter()
        .map(|v| v.kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn first_divergence(a: &[Verdict], b: &[Verdict]) -> Option<usize> {
    let common = a.len().min(b.len());
    (0..common)
        .find(|&i| a[i].kind != b[i].kind)
        .or_else(|| (a.len() != b.len()).then_some(common))
}
