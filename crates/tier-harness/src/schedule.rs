//! Warm-up schedules: the named checkpoints at which a scenario's result is sampled.

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Sampled point in a warm-up schedule.
///
/// `iterations` is cumulative: the checkpoint is sampled after the invocation has run that many
/// times in total. `argument_set` selects which of the scenario's argument sets drives the segment
/// ending at this checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCheckpoint {
    pub name: String,
    pub iterations: u64,
    pub argument_set: usize,
}

impl TierCheckpoint {
    pub fn new(name: impl Into<String>, iterations: u64) -> Self {
        Self {
            name: name.into(),
            iterations,
            argument_set: 0,
        }
    }

    pub fn with_argument_set(mut self, argument_set: usize) -> Self {
        self.argument_set = argument_set;
        self
    }
}

/// Checkpoint iteration counts and names used when nothing else is configured. Chosen so that
/// the interpreter, the simple JIT and the full JIT are each crossed at least once on common
/// engines.
pub const DEFAULT_CHECKPOINTS: [(&str, u64); 5] = [
    ("interpreted", 10),
    ("warm", 100),
    ("simple-jit", 500),
    ("full-jit", 2000),
    ("full-jit-steady", 5000),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    checkpoints: Vec<TierCheckpoint>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            checkpoints: DEFAULT_CHECKPOINTS
                .iter()
                .map(|(name, n)| TierCheckpoint::new(*name, *n))
                .collect(),
        }
    }
}

impl Schedule {
    pub fn new(checkpoints: Vec<TierCheckpoint>) -> Result<Self> {
        let schedule = Self { checkpoints };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Parse `name=count,name=count,...` or a bare `count,count,...` list.
    ///
    /// Bare counts are named `cp<count>`. Counts accept `_` separators.
    pub fn parse(input: &str) -> Result<Self> {
        let mut checkpoints = Vec::new();
        for term in input
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let (name, raw) = match term.split_once('=') {
                Some((name, raw)) => (name.trim().to_string(), raw),
                None => (String::new(), term),
            };
            let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
            let iterations = cleaned.parse::<u64>().map_err(|_| {
                HarnessError::InvalidConfig(format!(
                    "invalid checkpoint iteration count {raw:?} in schedule {input:?}"
                ))
            })?;
            let name = if name.is_empty() {
                format!("cp{iterations}")
            } else {
                name
            };
            checkpoints.push(TierCheckpoint::new(name, iterations));
        }
        if checkpoints.is_empty() {
            return Err(HarnessError::InvalidConfig(format!(
                "schedule {input:?} has no checkpoints"
            )));
        }
        Self::new(checkpoints)
    }

    pub fn checkpoints(&self) -> &[TierCheckpoint] {
        &self.checkpoints
    }

    /// Total number of invocations once the last checkpoint is reached.
    pub fn warmup_iterations(&self) -> u64 {
        self.checkpoints.last().map(|c| c.iterations).unwrap_or(0)
    }

    fn validate(&self) -> Result<()> {
        validate_checkpoints(&self.checkpoints)
            .map_err(|reason| HarnessError::InvalidConfig(format!("schedule: {reason}")))
    }
}

/// Checks the ordering invariants shared by schedules and scenario checkpoint lists.
pub(crate) fn validate_checkpoints(checkpoints: &[TierCheckpoint]) -> std::result::Result<(), String> {
    let Some(first) = checkpoints.first() else {
        return Err("no checkpoints".to_string());
    };
    if first.iterations == 0 {
        return Err(format!(
            "checkpoint {:?} samples after 0 iterations",
            first.name
        ));
    }
    for pair in checkpoints.windows(2) {
        if pair[1].iterations <= pair[0].iterations {
            return Err(format!(
                "checkpoint {:?} ({}) does not come after {:?} ({})",
                pair[1].name, pair[1].iterations, pair[0].name, pair[0].iterations
            ));
        }
    }
    let mut names = std::collections::BTreeSet::new();
    for cp in checkpoints {
        if cp.name.is_empty() || cp.name.contains(char::is_whitespace) || cp.name.contains('"') {
            return Err(format!("invalid checkpoint name {:?}", cp.name));
        }
        if !names.insert(cp.name.as_str()) {
            return Err(format!("duplicate checkpoint name {:?}", cp.name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_is_monotonic() {
        let schedule = Schedule::default();
        assert!(schedule.validate().is_ok());
        assert_eq!(schedule.warmup_iterations(), 5000);
        assert_eq!(schedule.checkpoints()[0].name, "interpreted");
    }

    #[test]
    fn parses_named_and_bare_counts() {
        let schedule = Schedule::parse("pre-jit=1, simple=1_000 ,full=10000").unwrap();
        let names: Vec<_> = schedule.checkpoints().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["pre-jit", "simple", "full"]);
        assert_eq!(schedule.checkpoints()[1].iterations, 1000);

        let bare = Schedule::parse("10,100").unwrap();
        assert_eq!(bare.checkpoints()[1].name, "cp100");
    }

    #[test]
    fn rejects_non_increasing_counts() {
        assert!(Schedule::parse("a=10,b=10").is_err());
        assert!(Schedule::parse("a=100,b=10").is_err());
        assert!(Schedule::parse("a=0").is_err());
        assert!(Schedule::parse("").is_err());
        assert!(Schedule::parse("a=x").is_err());
    }

    #[test]
    fn rejects_names_that_break_the_sentinel_protocol() {
        assert!(Schedule::parse("bad\"name=10").is_err());
        assert!(Schedule::parse("retype:Float64Array=10").is_ok());
        assert!(Schedule::parse("a=10,a=20").is_err());
    }
}
