//! Declarative description of one tier-transition test.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::schedule::{validate_checkpoints, Schedule, TierCheckpoint};
use crate::value::{ParamKind, ResultKind, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Arity,
    Polymorphic,
    Exceptions,
    Vectorized,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Arity => "arity",
            Family::Polymorphic => "polymorphic",
            Family::Exceptions => "exceptions",
            Family::Vectorized => "vectorized",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a non-Pass verdict fails the suite or is only reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    #[default]
    Strict,
    Advisory,
}

/// Pure function computing the expected result from one argument set.
#[derive(Clone)]
pub struct Oracle(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>);

impl Oracle {
    pub fn new(f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn constant(value: Value) -> Self {
        Self::new(move |_| value.clone())
    }

    pub fn expected(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }
}

impl fmt::Debug for Oracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Oracle(..)")
    }
}

/// What the SUT executes: `source` defines `function`, which is called with one of
/// `argument_sets` per iteration.
#[derive(Clone, Debug, Default)]
pub struct Invocation {
    pub source: String,
    pub function: String,
    pub argument_sets: Vec<Vec<Value>>,
}

#[derive(Clone, Debug)]
pub struct ScenarioSpec {
    pub id: String,
    pub family: Family,
    pub description: String,
    pub arity: usize,
    pub parameter_kinds: Vec<ParamKind>,
    pub result_kind: ResultKind,
    /// Compare zeros by sign bit instead of treating +0 and -0 as equal.
    pub zero_sign: bool,
    pub expectation: Expectation,
    pub checkpoints: Vec<TierCheckpoint>,
    pub invocation: Invocation,
    pub oracle: Oracle,
}

impl ScenarioSpec {
    pub fn builder(id: impl Into<String>, family: Family) -> ScenarioBuilder {
        ScenarioBuilder::new(id.into(), family)
    }

    pub fn warmup_iterations(&self) -> u64 {
        self.checkpoints.last().map(|c| c.iterations).unwrap_or(0)
    }

    pub fn arguments_for(&self, checkpoint: &TierCheckpoint) -> &[Value] {
        self.invocation
            .argument_sets
            .get(checkpoint.argument_set)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn expected_at(&self, checkpoint: &TierCheckpoint) -> Value {
        self.oracle.expected(self.arguments_for(checkpoint))
    }

    pub fn validate(&self) -> Result<()> {
        let id = self.id.as_str();
        if id.is_empty() || id.contains(char::is_whitespace) {
            return Err(HarnessError::invalid_scenario(id, "id must be non-empty without whitespace"));
        }
        if self.parameter_kinds.len() != self.arity {
            return Err(HarnessError::invalid_scenario(
                id,
                format!(
                    "arity {} does not match {} parameter kinds",
                    self.arity,
                    self.parameter_kinds.len()
                ),
            ));
        }
        if !is_identifier(&self.invocation.function) {
            return Err(HarnessError::invalid_scenario(
                id,
                format!("{:?} is not a valid function name", self.invocation.function),
            ));
        }
        if self.invocation.argument_sets.is_empty() {
            return Err(HarnessError::invalid_scenario(id, "no argument sets"));
        }
        for (idx, set) in self.invocation.argument_sets.iter().enumerate() {
            if set.len() != self.arity {
                return Err(HarnessError::invalid_scenario(
                    id,
                    format!("argument set {idx} has {} values, arity is {}", set.len(), self.arity),
                ));
            }
        }
        validate_checkpoints(&self.checkpoints)
            .map_err(|reason| HarnessError::invalid_scenario(id, reason))?;
        if self.warmup_iterations() == 0 {
            return Err(HarnessError::invalid_scenario(id, "warm-up iterations must be positive"));
        }
        for cp in &self.checkpoints {
            if cp.argument_set >= self.invocation.argument_sets.len() {
                return Err(HarnessError::invalid_scenario(
                    id,
                    format!(
                        "checkpoint {:?} uses argument set {} of {}",
                        cp.name,
                        cp.argument_set,
                        self.invocation.argument_sets.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

pub struct ScenarioBuilder {
    id: String,
    family: Family,
    description: String,
    parameter_kinds: Vec<ParamKind>,
    result_kind: ResultKind,
    zero_sign: bool,
    expectation: Expectation,
    checkpoints: Vec<TierCheckpoint>,
    invocation: Invocation,
    oracle: Option<Oracle>,
}

impl ScenarioBuilder {
    fn new(id: String, family: Family) -> Self {
        Self {
            id,
            family,
            description: String::new(),
            parameter_kinds: Vec::new(),
            result_kind: ResultKind::Integer,
            zero_sign: false,
            expectation: Expectation::Strict,
            checkpoints: Vec::new(),
            invocation: Invocation::default(),
            oracle: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn params(mut self, kinds: impl IntoIterator<Item = ParamKind>) -> Self {
        self.parameter_kinds = kinds.into_iter().collect();
        self
    }

    pub fn returns(mut self, kind: ResultKind) -> Self {
        self.result_kind = kind;
        self
    }

    pub fn zero_sign(mut self) -> Self {
        self.zero_sign = true;
        self
    }

    pub fn expectation(mut self, expectation: Expectation) -> Self {
        self.expectation = expectation;
        self
    }

    pub fn source(mut self, function: impl Into<String>, source: impl Into<String>) -> Self {
        self.invocation.function = function.into();
        self.invocation.source = source.into();
        self
    }

    pub fn arguments(mut self, args: Vec<Value>) -> Self {
        self.invocation.argument_sets.push(args);
        self
    }

    /// Use `schedule` for the checkpoints, all driven by argument set 0.
    pub fn schedule(mut self, schedule: &Schedule) -> Self {
        self.checkpoints = schedule.checkpoints().to_vec();
        self
    }

    pub fn checkpoint(mut self, checkpoint: TierCheckpoint) -> Self {
        self.checkpoints.push(checkpoint);
        self
    }

    pub fn oracle(mut self, f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        self.oracle = Some(Oracle::new(f));
        self
    }

    pub fn expect(mut self, value: Value) -> Self {
        self.oracle = Some(Oracle::constant(value));
        self
    }

    pub fn build(self) -> Result<ScenarioSpec> {
        let oracle = self
            .oracle
            .ok_or_else(|| HarnessError::invalid_scenario(&self.id, "missing oracle"))?;
        let spec = ScenarioSpec {
            arity: self.parameter_kinds.len(),
            id: self.id,
            family: self.family,
            description: self.description,
            parameter_kinds: self.parameter_kinds,
            result_kind: self.result_kind,
            zero_sign: self.zero_sign,
            expectation: self.expectation,
            checkpoints: self.checkpoints,
            invocation: self.invocation,
            oracle,
        };
        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add2() -> ScenarioBuilder {
        ScenarioSpec::builder("test/add2", Family::Arity)
            .params([ParamKind::Integer, ParamKind::Integer])
            .source("add2", "function add2(a, b) { return a + b; }")
            .arguments(vec![Value::int(1), Value::int(2)])
            .schedule(&Schedule::default())
            .oracle(|args| match (&args[0], &args[1]) {
                (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                _ => Value::Undefined,
            })
    }

    #[test]
    fn builder_produces_valid_spec() {
        let spec = add2().build().unwrap();
        assert_eq!(spec.arity, 2);
        assert_eq!(spec.warmup_iterations(), 5000);
        assert_eq!(spec.expected_at(&spec.checkpoints[0]), Value::int(3));
    }

    #[test]
    fn arity_must_match_argument_sets() {
        let err = add2()
            .arguments(vec![Value::int(1)])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("argument set 1"), "{err}");
    }

    #[test]
    fn checkpoints_must_reference_existing_argument_sets() {
        let err = add2()
            .checkpoint(TierCheckpoint::new("retype", 6000).with_argument_set(3))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("argument set 3"), "{err}");
    }

    #[test]
    fn warmup_must_be_positive() {
        let err = ScenarioSpec::builder("test/empty", Family::Arity)
            .source("f", "function f() { return 1; }")
            .arguments(vec![])
            .expect(Value::int(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, HarnessError::InvalidScenario { .. }));
    }

    #[test]
    fn function_name_must_be_an_identifier() {
        let err = add2().source("add 2", "").build().unwrap_err();
        assert!(err.to_string().contains("function name"), "{err}");
        assert!(is_identifier("$probe_7"));
        assert!(!is_identifier("7probe"));
    }
}
