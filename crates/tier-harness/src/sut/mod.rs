//! The boundary to the system under test.
//!
//! The harness never looks inside the runtime: it hands over a probe script and gets back the
//! parsed sentinel lines plus how the process ended.

#[cfg(any(test, feature = "test-utils"))]
mod fake;
mod process;

#[cfg(any(test, feature = "test-utils"))]
pub use fake::{FakeCall, FakeResponse, FakeSut};
pub use process::{ProcessSut, SutConfig};

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::probe::ProbeScript;
use crate::sentinel::Sentinel;

/// How a probe execution ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process ended on its own. `signal` is set when it was killed by a signal (unix).
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
    /// The per-scenario deadline passed; the process was killed and reaped.
    TimedOut,
}

impl ExitOutcome {
    pub fn clean() -> Self {
        ExitOutcome::Exited {
            code: Some(0),
            signal: None,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            ExitOutcome::Exited {
                code: Some(0),
                signal: None
            }
        )
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited {
                signal: Some(sig), ..
            } => write!(f, "killed by signal {sig}"),
            ExitOutcome::Exited {
                code: Some(code), ..
            } => write!(f, "exit code {code}"),
            ExitOutcome::Exited { .. } => f.write_str("exited without status"),
            ExitOutcome::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Everything observed while the SUT ran one probe script.
#[derive(Clone, Debug, PartialEq)]
pub struct Execution {
    pub sentinels: Vec<Sentinel>,
    pub outcome: ExitOutcome,
    /// Last bytes of stderr, lossily decoded.
    pub stderr_tail: String,
}

/// A runtime the harness can feed probe scripts to.
///
/// Implementations must run one probe at a time; tier state is process-global, so callers never
/// share a `Sut` between concurrently running scenarios.
pub trait Sut: Send {
    fn label(&self) -> &str;

    fn execute(
        &mut self,
        probe: &ProbeScript,
        timeout: Duration,
    ) -> impl Future<Output = Result<Execution>> + Send;

    /// Bring the SUT back to a clean tier state after a crash or timeout.
    fn reset(&mut self) -> impl Future<Output = Result<()>> + Send;
}
