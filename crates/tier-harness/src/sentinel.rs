//! Line-oriented stdout protocol spoken by generated probe scripts.
//!
//! ```text
//! CHECKPOINT:<name>
//! RESULT:<typeof>:<json string>
//! FAULT:<checkpoint>:<json string>
//! SAMPLE:<iterations>:<elapsed ms>
//! DONE
//! ```
//!
//! Lines without a known prefix are SUT chatter and are passed through as [`Sentinel::Chatter`].

use crate::error::{HarnessError, Result};
use crate::value::Value;

pub const CHECKPOINT_PREFIX: &str = "CHECKPOINT:";
pub const RESULT_PREFIX: &str = "RESULT:";
pub const FAULT_PREFIX: &str = "FAULT:";
pub const SAMPLE_PREFIX: &str = "SAMPLE:";
pub const DONE_LINE: &str = "DONE";

#[derive(Clone, Debug, PartialEq)]
pub enum Sentinel {
    Checkpoint(String),
    Result { value: Value, raw: String },
    Fault { checkpoint: String, message: String },
    Sample { iterations: u64, elapsed_ms: f64 },
    Done,
    Chatter(String),
}

pub fn parse_line(line: &str) -> Result<Sentinel> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(name) = line.strip_prefix(CHECKPOINT_PREFIX) {
        if name.is_empty() {
            return Err(HarnessError::malformed(line, "empty checkpoint name"));
        }
        return Ok(Sentinel::Checkpoint(name.to_string()));
    }

    if let Some(rest) = line.strip_prefix(RESULT_PREFIX) {
        let (kind, payload) = rest
            .split_once(':')
            .ok_or_else(|| HarnessError::malformed(line, "missing value kind"))?;
        let raw = decode_json_string(line, payload)?;
        let value = Value::from_sentinel(kind, &raw).map_err(|err| match err {
            HarnessError::MalformedSentinel { reason, .. } => HarnessError::malformed(line, reason),
            other => other,
        })?;
        return Ok(Sentinel::Result { value, raw });
    }

    if let Some(rest) = line.strip_prefix(FAULT_PREFIX) {
        // Checkpoint names may contain ':' but never '"', so the payload starts at the first `:"`.
        let split = rest
            .find(":\"")
            .ok_or_else(|| HarnessError::malformed(line, "missing fault checkpoint"))?;
        let (checkpoint, payload) = (&rest[..split], &rest[split + 1..]);
        if checkpoint.is_empty() {
            return Err(HarnessError::malformed(line, "empty fault checkpoint"));
        }
        let message = decode_json_string(line, payload)?;
        return Ok(Sentinel::Fault {
            checkpoint: checkpoint.to_string(),
            message,
        });
    }

    if let Some(rest) = line.strip_prefix(SAMPLE_PREFIX) {
        let (iterations, elapsed) = rest
            .split_once(':')
            .ok_or_else(|| HarnessError::malformed(line, "missing sample elapsed time"))?;
        let iterations = iterations
            .trim()
            .parse::<u64>()
            .map_err(|_| HarnessError::malformed(line, "invalid sample iteration count"))?;
        let elapsed_ms = elapsed
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| HarnessError::malformed(line, "invalid sample elapsed time"))?;
        return Ok(Sentinel::Sample {
            iterations,
            elapsed_ms,
        });
    }

    if line == DONE_LINE {
        return Ok(Sentinel::Done);
    }

    Ok(Sentinel::Chatter(line.to_string()))
}

fn decode_json_string(line: &str, payload: &str) -> Result<String> {
    serde_json::from_str::<String>(payload)
        .map_err(|e| HarnessError::malformed(line, format!("payload is not a JSON string: {e}")))
}
