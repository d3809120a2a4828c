//! In-process stand-in for a runtime, for driver and suite tests.

use std::collections::HashMap;
use std::time::Duration;

use super::{Execution, ExitOutcome, Sut};
use crate::error::Result;
use crate::probe::ProbeScript;
use crate::scenario::ScenarioSpec;
use crate::sentinel::Sentinel;
use crate::value::Value;

/// What the fake runtime does when a checkpoint is reached.
#[derive(Clone, Debug, PartialEq)]
pub enum FakeResponse {
    Value(Value),
    /// The loop threw; the probe reports a fault and stops.
    Fault(String),
    /// The runtime stops producing output until the deadline passes.
    Hang,
    /// The runtime dies with this exit code.
    Exit(i32),
}

/// Context handed to a [`FakeSut`] behaviour for one checkpoint.
#[derive(Debug)]
pub struct FakeCall<'a> {
    pub scenario_id: &'a str,
    pub checkpoint: &'a str,
    pub index: usize,
    /// How many times this scenario has been executed before, including this one (1-based).
    pub run: u64,
    /// What the scenario's oracle expects, when the scenario was registered.
    pub expected: Option<&'a Value>,
}

type Behavior = Box<dyn FnMut(&FakeCall<'_>) -> FakeResponse + Send>;

pub struct FakeSut {
    label: String,
    expected: HashMap<String, Vec<Value>>,
    behavior: Behavior,
    samples: Vec<(u64, f64)>,
    runs: HashMap<String, u64>,
    executions: u64,
    resets: u64,
}

impl FakeSut {
    pub fn new(behavior: impl FnMut(&FakeCall<'_>) -> FakeResponse + Send + 'static) -> Self {
        Self {
            label: "fake".to_string(),
            expected: HashMap::new(),
            behavior: Box::new(behavior),
            samples: Vec::new(),
            runs: HashMap::new(),
            executions: 0,
            resets: 0,
        }
    }

    /// A runtime without tier bugs: every checkpoint returns exactly what the oracle expects.
    pub fn faithful<'a>(specs: impl IntoIterator<Item = &'a ScenarioSpec>) -> Self {
        Self::new(|call| match call.expected {
            Some(v) => FakeResponse::Value(v.clone()),
            None => FakeResponse::Value(Value::Undefined),
        })
        .with_scenarios(specs)
    }

    /// Record the expected values of `specs` so behaviours can see them in [`FakeCall::expected`].
    pub fn with_scenarios<'a>(mut self, specs: impl IntoIterator<Item = &'a ScenarioSpec>) -> Self {
        for spec in specs {
            let values = spec.checkpoints.iter().map(|cp| spec.expected_at(cp)).collect();
            self.expected.insert(spec.id.clone(), values);
        }
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// `SAMPLE` lines emitted for probes that declare no checkpoints (calibration probes).
    pub fn with_samples(mut self, samples: Vec<(u64, f64)>) -> Self {
        self.samples = samples;
        self
    }

    pub fn executions(&self) -> u64 {
        self.executions
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }
}

impl Sut for FakeSut {
    fn label(&self) -> &str {
        &self.label
    }

    async fn execute(&mut self, probe: &ProbeScript, _timeout: Duration) -> Result<Execution> {
        self.executions += 1;
        let run = {
            let n = self.runs.entry(probe.scenario_id.clone()).or_insert(0);
            *n += 1;
            *n
        };

        let mut sentinels = Vec::new();
        if probe.checkpoints.is_empty() {
            sentinels.extend(self.samples.iter().map(|&(iterations, elapsed_ms)| {
                Sentinel::Sample {
                    iterations,
                    elapsed_ms,
                }
            }));
            sentinels.push(Sentinel::Done);
            return Ok(Execution {
                sentinels,
                outcome: ExitOutcome::clean(),
                stderr_tail: String::new(),
            });
        }

        let expected = self.expected.get(&probe.scenario_id);
        for (index, checkpoint) in probe.checkpoints.iter().enumerate() {
            let call = FakeCall {
                scenario_id: &probe.scenario_id,
                checkpoint,
                index,
                run,
                expected: expected.and_then(|values| values.get(index)),
            };
            match (self.behavior)(&call) {
                FakeResponse::Value(value) => {
                    sentinels.push(Sentinel::Checkpoint(checkpoint.clone()));
                    sentinels.push(Sentinel::Result {
                        raw: value.text(),
                        value,
                    });
                }
                FakeResponse::Fault(message) => {
                    sentinels.push(Sentinel::Fault {
                        checkpoint: checkpoint.clone(),
                        message,
                    });
                    return Ok(Execution {
                        sentinels,
                        outcome: ExitOutcome::clean(),
                        stderr_tail: String::new(),
                    });
                }
                FakeResponse::Hang => {
                    return Ok(Execution {
                        sentinels,
                        outcome: ExitOutcome::TimedOut,
                        stderr_tail: String::new(),
                    });
                }
                FakeResponse::Exit(code) => {
                    return Ok(Execution {
                        sentinels,
                        outcome: ExitOutcome::Exited {
                            code: Some(code),
                            signal: None,
                        },
                        stderr_tail: format!("fake runtime exited with {code}"),
                    });
                }
            }
        }
        sentinels.push(Sentinel::Done);
        Ok(Execution {
            sentinels,
            outcome: ExitOutcome::clean(),
            stderr_tail: String::new(),
        })
    }

    async fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }
}
