use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of one sampled checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictKind {
    Pass,
    WrongValue,
    /// Verdict kinds disagreed between repeated runs of the same scenario.
    Unstable,
    Timeout,
    Crashed,
    Corrupted,
}

impl VerdictKind {
    pub const ALL: [VerdictKind; 6] = [
        VerdictKind::Pass,
        VerdictKind::WrongValue,
        VerdictKind::Unstable,
        VerdictKind::Timeout,
        VerdictKind::Crashed,
        VerdictKind::Corrupted,
    ];

    /// Rank used to pick a scenario's overall verdict:
    /// Corrupted > Crashed > Timeout > Unstable > WrongValue > Pass.
    pub fn severity(self) -> u8 {
        match self {
            VerdictKind::Pass => 0,
            VerdictKind::WrongValue => 1,
            VerdictKind::Unstable => 2,
            VerdictKind::Timeout => 3,
            VerdictKind::Crashed => 4,
            VerdictKind::Corrupted => 5,
        }
    }

    pub fn is_pass(self) -> bool {
        self == VerdictKind::Pass
    }

    /// Whether the driver stops sampling the scenario after this verdict.
    pub fn aborts_scenario(self) -> bool {
        matches!(self, VerdictKind::Crashed | VerdictKind::Timeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VerdictKind::Pass => "Pass",
            VerdictKind::WrongValue => "WrongValue",
            VerdictKind::Unstable => "Unstable",
            VerdictKind::Timeout => "Timeout",
            VerdictKind::Crashed => "Crashed",
            VerdictKind::Corrupted => "Corrupted",
        }
    }
}

impl PartialOrd for VerdictKind {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VerdictKind {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one checkpoint plus the diagnostics needed to explain it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    pub checkpoint: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    /// Raw text payload exactly as the SUT reported it.
    pub raw: Option<String>,
    pub detail: Option<String>,
}

impl Verdict {
    pub fn new(kind: VerdictKind, checkpoint: impl Into<String>) -> Self {
        Self {
            kind,
            checkpoint: checkpoint.into(),
            expected: None,
            actual: None,
            raw: None,
            detail: None,
        }
    }

    pub fn with_values(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
