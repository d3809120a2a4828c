use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Failures of the harness itself, as opposed to failures of the system under test.
///
/// SUT misbehaviour (wrong values, corruption, crashes, hangs) is always reported as a
/// [`crate::Verdict`]. A `HarnessError` means the run cannot be trusted at all and maps to exit
/// status 2.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("SUT unreachable: failed to spawn {program}: {source}")]
    SutUnreachable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed sentinel line {line:?}: {reason}")]
    MalformedSentinel { line: String, reason: String },

    #[error("sentinel out of order in scenario {scenario}: expected checkpoint {expected:?}, got {actual:?}")]
    SentinelOrder {
        scenario: String,
        expected: String,
        actual: String,
    },

    #[error("invalid scenario {id}: {reason}")]
    InvalidScenario { id: String, reason: String },

    #[error("duplicate scenario id {0}")]
    DuplicateScenario(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("filter {filter:?} matched 0 scenarios")]
    EmptySelection { filter: String },

    #[error("suite {suite} aborted: {reason}")]
    SuiteAborted { suite: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    pub fn invalid_scenario(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidScenario {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::MalformedSentinel {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    /// Process exit status reserved for harness-internal failures.
    pub fn exit_code(&self) -> u8 {
        2
    }
}
