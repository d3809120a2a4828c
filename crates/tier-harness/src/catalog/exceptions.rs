//! Exception scenarios: throws and finally blocks whose unwinding crosses frames compiled by
//! different tiers.

use super::CatalogConfig;
use crate::error::Result;
use crate::scenario::{Family, ScenarioSpec};
use crate::schedule::{Schedule, TierCheckpoint};
use crate::value::{ParamKind, ResultKind, Value};

const THROW_LOOP: i64 = 1000;
const SHORT_LOOP: i64 = 100;
const UNWIND_DEPTH: i64 = 50;

pub(super) fn scenarios(config: &CatalogConfig) -> Result<Vec<ScenarioSpec>> {
    Ok(vec![
        every_third_throw(config)?,
        finally_count(config)?,
        nested_finally_order(config)?,
        deep_unwind(config)?,
        rethrow(config)?,
        thrown_values(config)?,
        return_through_finally(config)?,
        loop_catch_sum(config)?,
    ])
}

/// Scenarios that loop internally reach each tier through their loop body after few calls. Divide
/// the call counts so the total work per checkpoint stays comparable to the other families, and
/// prefix the names with `loop-`: the checkpoint marks loop iterations, not call count.
fn scaled(schedule: &Schedule, divisor: u64) -> Result<Schedule> {
    let mut prev = 0;
    let checkpoints = schedule
        .checkpoints()
        .iter()
        .map(|cp| {
            let iterations = cp.iterations.div_ceil(divisor).max(prev + 1);
            prev = iterations;
            TierCheckpoint::new(format!("loop-{}", cp.name), iterations)
        })
        .collect();
    Schedule::new(checkpoints)
}

fn integer(args: &[Value], idx: usize) -> i64 {
    match args.get(idx) {
        Some(Value::Number(n)) => *n as i64,
        _ => 0,
    }
}

fn every_third_throw(config: &CatalogConfig) -> Result<ScenarioSpec> {
    ScenarioSpec::builder("exceptions/every-third-throw", Family::Exceptions)
        .describe("throw on every third iteration inside try/finally inside try/catch (loop-driven schedule, calls divided by 100)")
        .params([ParamKind::Integer])
        .source(
            "everyThirdThrow",
            r#"function everyThirdThrow(n) {
  var caught = 0;
  for (var i = 0; i < n; i++) {
    try {
      try {
        if (i % 3 === 0) {
          throw new Error("t" + i);
        }
      } finally {
      }
    } catch (e) {
      caught++;
    }
  }
  return caught;
}"#,
        )
        .arguments(vec![Value::int(THROW_LOOP)])
        .schedule(&scaled(&config.schedule, 100)?)
        .oracle(|args| {
            let n = integer(args, 0).max(0);
            Value::int((n + 2) / 3)
        })
        .build()
}

fn finally_count(config: &CatalogConfig) -> Result<ScenarioSpec> {
    ScenarioSpec::builder("exceptions/finally-count", Family::Exceptions)
        .describe("finally runs on fall-through, continue and throw alike (loop-driven schedule, calls divided by 10)")
        .params([ParamKind::Integer])
        .source(
            "finallyCount",
            r#"function finallyCount(n) {
  var f = 0;
  for (var i = 0; i < n; i++) {
    try {
      if (i % 2 === 0) {
        continue;
      }
      if (i % 5 === 0) {
        throw i;
      }
    } catch (e) {
    } finally {
      f++;
    }
  }
  return f;
}"#,
        )
        .arguments(vec![Value::int(SHORT_LOOP)])
        .schedule(&scaled(&config.schedule, 10)?)
        .oracle(|args| Value::int(integer(args, 0).max(0)))
        .build()
}

/// Tokens: b = before throw, i = inner finally, c<tag> = catch, o = outer finally.
fn nested_finally_order(config: &CatalogConfig) -> Result<ScenarioSpec> {
    ScenarioSpec::builder("exceptions/nested-finally-order", Family::Exceptions)
        .describe("inner finally runs before the outer catch, outer finally last")
        .params([ParamKind::String])
        .returns(ResultKind::String)
        .source(
            "nestedFinallyOrder",
            r#"function nestedFinallyOrder(tag) {
  var t = "";
  try {
    try {
      t += "b";
      throw new Error(tag);
    } finally {
      t += "i";
    }
  } catch (e) {
    t += "c" + e.message;
  } finally {
    t += "o";
  }
  return t;
}"#,
        )
        .arguments(vec![Value::str("3")])
        .schedule(&config.schedule)
        .oracle(|args| match args.first() {
            Some(tag) => Value::Str(format!("bic{}o", tag.text())),
            None => Value::Undefined,
        })
        .build()
}

fn deep_unwind(config: &CatalogConfig) -> Result<ScenarioSpec> {
    ScenarioSpec::builder("exceptions/deep-unwind", Family::Exceptions)
        .describe("throw from the bottom of a recursion where every frame has a finally")
        .params([ParamKind::Integer])
        .source(
            "deepUnwind",
            r#"var unwindFinallies = 0;
function unwindFrame(d) {
  try {
    if (d === 0) {
      throw new Error("bottom");
    }
    return unwindFrame(d - 1);
  } finally {
    unwindFinallies++;
  }
}
function deepUnwind(depth) {
  unwindFinallies = 0;
  try {
    unwindFrame(depth);
  } catch (e) {
    return unwindFinallies;
  }
  return -1;
}"#,
        )
        .arguments(vec![Value::int(UNWIND_DEPTH)])
        .schedule(&config.schedule)
        .oracle(|args| Value::int(integer(args, 0).max(0) + 1))
        .build()
}

fn rethrow(config: &CatalogConfig) -> Result<ScenarioSpec> {
    ScenarioSpec::builder("exceptions/rethrow", Family::Exceptions)
        .describe("catch, transform and rethrow to an outer handler")
        .params([ParamKind::Integer])
        .source(
            "rethrowChain",
            r#"function rethrowChain(n) {
  var seen = 0;
  try {
    try {
      throw n;
    } catch (e) {
      seen += e;
      throw e * 2;
    }
  } catch (e2) {
    seen += e2;
  }
  return seen;
}"#,
        )
        .arguments(vec![Value::int(7)])
        .schedule(&config.schedule)
        .oracle(|args| Value::int(integer(args, 0) * 3))
        .build()
}

fn thrown_values(config: &CatalogConfig) -> Result<ScenarioSpec> {
    ScenarioSpec::builder("exceptions/thrown-values", Family::Exceptions)
        .describe("numbers, strings, null, undefined, booleans, objects, arrays, errors and functions thrown and caught by identity")
        .params([ParamKind::Integer])
        .source(
            "thrownKinds",
            r#"var thrownSamples = [1, "s", null, undefined, true, {}, [], new Error("e"), function () {}];
function thrownKinds(k) {
  var caught = 0;
  for (var i = 0; i < k && i < thrownSamples.length; i++) {
    try {
      throw thrownSamples[i];
    } catch (e) {
      if (e === thrownSamples[i]) {
        caught++;
      }
    }
  }
  return caught;
}"#,
        )
        .arguments(vec![Value::int(9)])
        .schedule(&config.schedule)
        .oracle(|args| Value::int(integer(args, 0).clamp(0, 9)))
        .build()
}

fn return_through_finally(config: &CatalogConfig) -> Result<ScenarioSpec> {
    ScenarioSpec::builder("exceptions/return-through-finally", Family::Exceptions)
        .describe("return value survives a finally that writes shared state")
        .params([ParamKind::Integer])
        .source(
            "returnThroughFinally",
            r#"var finallyLog = 0;
function returnInner(x) {
  try {
    return x * 2;
  } finally {
    finallyLog = x + 1;
  }
}
function returnThroughFinally(x) {
  finallyLog = 0;
  var r = returnInner(x);
  return r * 100 + finallyLog;
}"#,
        )
        .arguments(vec![Value::int(5)])
        .schedule(&config.schedule)
        .oracle(|args| {
            let x = integer(args, 0);
            Value::int(x * 2 * 100 + x + 1)
        })
        .build()
}

fn loop_catch_sum(config: &CatalogConfig) -> Result<ScenarioSpec> {
    ScenarioSpec::builder("exceptions/loop-catch-sum", Family::Exceptions)
        .describe("accumulator updated on both the normal and the catch path of a loop (loop-driven schedule, calls divided by 10)")
        .params([ParamKind::Integer])
        .source(
            "loopCatchSum",
            r#"function loopCatchSum(n) {
  var sum = 0;
  for (var i = 0; i < n; i++) {
    try {
      if (i % 3 === 0) {
        throw i;
      }
      sum += i;
    } catch (e) {
      sum -= e;
    }
  }
  return sum;
}"#,
        )
        .arguments(vec![Value::int(SHORT_LOOP)])
        .schedule(&scaled(&config.schedule, 10)?)
        .oracle(|args| {
            let n = integer(args, 0).max(0);
            Value::int((0..n).map(|i| if i % 3 == 0 { -i } else { i }).sum())
        })
        .build()
}
