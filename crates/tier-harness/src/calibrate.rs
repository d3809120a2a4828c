//! Tier-threshold discovery.
//!
//! A small hot kernel runs in doubling batches and each batch reports its wall time. Each time
//! the per-call cost drops to half of the current level or less, the runtime is assumed to have
//! promoted the kernel to a faster tier, and a checkpoint is placed at the end of that batch.

use std::fmt::Write as _;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::probe::{js_string, runtime_prelude, ProbeScript, SCENARIO_HEADER};
use crate::schedule::{Schedule, TierCheckpoint};
use crate::sentinel::{Sentinel, DONE_LINE, SAMPLE_PREFIX};
use crate::sut::Sut;

pub const CALIBRATION_ID: &str = "calibration/threshold";
pub const DEFAULT_CALIBRATION_ITERATIONS: u64 = 1 << 16;

/// Minimum ratio between the current cost level and a new batch's per-call cost.
const TRANSITION_RATIO: f64 = 2.0;

/// Probe that reports `SAMPLE:<batch-size>:<elapsed-ms>` for batches of 1, 2, 4, ... calls until
/// `max_iterations` calls have run in total.
pub fn calibration_script(max_iterations: u64) -> ProbeScript {
    let mut src = String::new();
    let _ = writeln!(src, "{SCENARIO_HEADER}{CALIBRATION_ID}");
    src.push_str(&runtime_prelude());
    let _ = write!(
        src,
        r#"
var __tp_now = (typeof performance !== "undefined" && typeof performance.now === "function")
  ? function () {{ return performance.now(); }}
  : function () {{ return Date.now(); }};

function __tp_kernel(x) {{
  var s = 0;
  for (var k = 0; k < 16; k++) {{
    s = (s + x * k) | 0;
  }}
  return s;
}}

function __tp_calibrate(limit) {{
  var sink = 0;
  var batch = 1;
  var total = 0;
  while (total < limit) {{
    var t0 = __tp_now();
    for (var i = 0; i < batch; i++) {{
      sink = (sink + __tp_kernel(i)) | 0;
    }}
    var dt = __tp_now() - t0;
    total += batch;
    __tp_print({sample} + batch + ":" + (dt < 0 ? 0 : dt));
    batch *= 2;
  }}
  return sink;
}}

__tp_calibrate({max_iterations});
__tp_print({done});
"#,
        sample = js_string(SAMPLE_PREFIX),
        done = js_string(DONE_LINE),
    );
    ProbeScript {
        scenario_id: CALIBRATION_ID.to_string(),
        checkpoints: Vec::new(),
        source: src,
    }
}

/// Derive a schedule from `(batch_size, elapsed_ms)` samples, in the order they were reported.
///
/// The schedule starts with an `interpreted` checkpoint after the first measurable batch, has a
/// `tier-N` checkpoint after each detected transition and ends with `steady` at twice the last
/// transition. Returns `None` when no transition shows up, in which case callers keep their
/// configured schedule.
pub fn schedule_from_samples(samples: &[(u64, f64)]) -> Option<Schedule> {
    let mut total = 0u64;
    let mut level: Option<f64> = None;
    let mut checkpoints = Vec::new();

    for &(batch, elapsed_ms) in samples {
        total = total.saturating_add(batch);
        if batch == 0 || elapsed_ms <= 0.0 {
            continue;
        }
        let cost = elapsed_ms / batch as f64;
        match level {
            None => {
                checkpoints.push(TierCheckpoint::new("interpreted", total));
                level = Some(cost);
            }
            Some(current) if cost * TRANSITION_RATIO <= current => {
                debug!(iterations = total, cost, previous = current, "tier transition");
                checkpoints.push(TierCheckpoint::new(
                    format!("tier-{}", checkpoints.len()),
                    total,
                ));
                level = Some(cost);
            }
            Some(_) => {}
        }
    }

    if checkpoints.len() < 2 {
        return None;
    }
    let last = checkpoints.last()?.iterations;
    checkpoints.push(TierCheckpoint::new("steady", last.saturating_mul(2)));
    Schedule::new(checkpoints).ok()
}

/// Run the calibration probe and derive a schedule from it. `Ok(None)` means the runtime gave no
/// usable signal; the caller should keep its configured schedule.
pub async fn calibrate<S: Sut>(sut: &mut S, timeout: Duration) -> Result<Option<Schedule>> {
    let probe = calibration_script(DEFAULT_CALIBRATION_ITERATIONS);
    let execution = sut.execute(&probe, timeout).await?;
    let samples: Vec<(u64, f64)> = execution
        .sentinels
        .iter()
        .filter_map(|s| match s {
            Sentinel::Sample {
                iterations,
                elapsed_ms,
            } => Some((*iterations, *elapsed_ms)),
            _ => None,
        })
        .collect();

    if !execution.outcome.is_clean() {
        warn!(
            sut = sut.label(),
            outcome = %execution.outcome,
            samples = samples.len(),
            "calibration probe did not finish cleanly"
        );
        sut.reset().await?;
        return Ok(None);
    }

    let schedule = schedule_from_samples(&samples);
    match &schedule {
        Some(schedule) => info!(
            sut = sut.label(),
            checkpoints = ?schedule
                .checkpoints()
                .iter()
                .map(|c| format!("{}={}", c.name, c.iterations))
                .collect::<Vec<_>>(),
            "calibrated schedule"
        ),
        None => warn!(
            sut = sut.label(),
            samples = samples.len(),
            "no tier transition detected; keeping configured schedule"
        ),
    }
    Ok(schedule)
}
