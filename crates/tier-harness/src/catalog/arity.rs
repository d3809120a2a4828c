//! Register-overflow scenarios: functions whose parameter count crosses the number of arguments
//! the calling convention passes in registers, so the trailing ones live in stack slots.

use super::{param_list, CatalogConfig};
use crate::error::Result;
use crate::scenario::{Family, ScenarioSpec};
use crate::value::{ParamKind, ResultKind, Value};

/// The parameter count every catalog covers, whatever the configured register limit.
const CANONICAL_ARITY: usize = 7;

pub(super) fn arities(register_arg_limit: usize) -> Vec<usize> {
    let low = register_arg_limit.saturating_sub(2).max(1);
    let mut counts: Vec<usize> = (low..=register_arg_limit + 3).collect();
    if !counts.contains(&CANONICAL_ARITY) {
        counts.push(CANONICAL_ARITY);
        counts.sort_unstable();
    }
    counts
}

pub(super) fn scenarios(config: &CatalogConfig) -> Result<Vec<ScenarioSpec>> {
    let mut out = Vec::new();
    for n in arities(config.register_arg_limit) {
        out.push(sum(config, n)?);
        out.push(probe(config, n)?);
        out.push(float_sum(config, n)?);
        out.push(string_tail(config, n)?);
        out.push(nested(config, n)?);
    }
    Ok(out)
}

fn plus_chain(n: usize) -> String {
    (1..=n)
        .map(|i| format!("p{i}"))
        .collect::<Vec<_>>()
        .join(" + ")
}

fn ints(n: usize) -> Vec<Value> {
    (1..=n as i64).map(Value::int).collect()
}

fn number(v: &Value) -> f64 {
    match v {
        Value::Number(n) => *n,
        _ => f64::NAN,
    }
}

fn sum(config: &CatalogConfig, n: usize) -> Result<ScenarioSpec> {
    let name = format!("sum{n}");
    ScenarioSpec::builder(format!("arity/{name}"), Family::Arity)
        .describe(format!("{n} integer arguments summed; 1..={n}"))
        .params(vec![ParamKind::Integer; n])
        .returns(ResultKind::Integer)
        .source(
            &name,
            format!("function {name}({}) {{\n  return {};\n}}", param_list(n), plus_chain(n)),
        )
        .arguments(ints(n))
        .schedule(&config.schedule)
        .oracle(|args| Value::Number(args.iter().map(number).sum()))
        .build()
}

/// Trailing parameters `probeN` echoes verbatim.
const PROBE_ECHO: usize = 6;

/// Every parameter is observable in the result, so a slot that reads its neighbour shows up: the
/// trailing slots are echoed in order and all slots feed a position-weighted checksum. The text
/// stays short at any register limit.
fn probe(config: &CatalogConfig, n: usize) -> Result<ScenarioSpec> {
    let name = format!("probe{n}");
    let first = n.saturating_sub(PROBE_ECHO) + 1;
    let echoed = (first..=n)
        .map(|i| format!("p{i}"))
        .collect::<Vec<_>>()
        .join(" + \",\" + ");
    let weighted = (1..=n)
        .map(|i| format!("p{i} * {i}"))
        .collect::<Vec<_>>()
        .join(" + ");
    ScenarioSpec::builder(format!("arity/{name}"), Family::Arity)
        .describe(format!(
            "{n} distinct integer arguments; slots {first}..={n} echoed in order, then a weighted checksum of all"
        ))
        .params(vec![ParamKind::Integer; n])
        .returns(ResultKind::String)
        .source(
            &name,
            format!(
                "function {name}({}) {{\n  return \"\" + {echoed} + \"|\" + ({weighted});\n}}",
                param_list(n)
            ),
        )
        .arguments(ints(n))
        .schedule(&config.schedule)
        .oracle(|args| {
            let tail = &args[args.len().saturating_sub(PROBE_ECHO)..];
            let echoed = tail.iter().map(Value::text).collect::<Vec<_>>().join(",");
            let weighted: f64 = args
                .iter()
                .enumerate()
                .map(|(i, v)| number(v) * (i + 1) as f64)
                .sum();
            Value::Str(format!("{echoed}|{}", Value::Number(weighted).text()))
        })
        .build()
}

fn float_sum(config: &CatalogConfig, n: usize) -> Result<ScenarioSpec> {
    let name = format!("fsum{n}");
    let args: Vec<Value> = (1..=n).map(|i| Value::Number(i as f64 + 0.5)).collect();
    ScenarioSpec::builder(format!("arity/{name}"), Family::Arity)
        .describe(format!("{n} float arguments summed through float registers"))
        .params(vec![ParamKind::Float; n])
        .returns(ResultKind::Float)
        .source(
            &name,
            format!("function {name}({}) {{\n  return {};\n}}", param_list(n), plus_chain(n)),
        )
        .arguments(args)
        .schedule(&config.schedule)
        .oracle(|args| Value::Number(args.iter().map(number).sum()))
        .build()
}

/// A string in the last slot; when the slot aliases a callee the result starts with its source.
fn string_tail(config: &CatalogConfig, n: usize) -> Result<ScenarioSpec> {
    let name = format!("strtail{n}");
    let ints_sum = if n > 1 { plus_chain(n - 1) } else { "0".to_string() };
    let mut kinds = vec![ParamKind::Integer; n - 1];
    kinds.push(ParamKind::String);
    let mut args = ints(n - 1);
    args.push(Value::str("tail"));
    ScenarioSpec::builder(format!("arity/{name}"), Family::Arity)
        .describe(format!("{} integers then a string in the last parameter", n - 1))
        .params(kinds)
        .returns(ResultKind::String)
        .source(
            &name,
            format!(
                "function {name}({}) {{\n  return p{n} + \":\" + ({ints_sum});\n}}",
                param_list(n)
            ),
        )
        .arguments(args)
        .schedule(&config.schedule)
        .oracle(|args| {
            let Some((tail, ints)) = args.split_last() else {
                return Value::Undefined;
            };
            let total: f64 = ints.iter().map(number).sum();
            Value::Str(format!("{}:{}", tail.text(), crate::value::number_text(total)))
        })
        .build()
}

/// A hot caller forwarding all of its arguments to an N-ary callee, so both frames get compiled
/// and the JIT-to-JIT call path carries the overflow slots. The weights make swapped arguments
/// visible.
fn nested(config: &CatalogConfig, n: usize) -> Result<ScenarioSpec> {
    let name = format!("nested{n}");
    let callee = format!("{name}_callee");
    let weighted = (1..=n)
        .map(|i| format!("p{i} * {i}"))
        .collect::<Vec<_>>()
        .join(" + ");
    ScenarioSpec::builder(format!("arity/{name}"), Family::Arity)
        .describe(format!("JIT-to-JIT call forwarding {n} arguments"))
        .params(vec![ParamKind::Integer; n])
        .returns(ResultKind::Integer)
        .source(
            &name,
            format!(
                "function {callee}({params}) {{\n  return {weighted};\n}}\n\
                 function {name}({params}) {{\n  return {callee}({params});\n}}",
                params = param_list(n)
            ),
        )
        .arguments(ints(n))
        .schedule(&config.schedule)
        .oracle(|args| {
            Value::Number(
                args.iter()
                    .enumerate()
                    .map(|(i, v)| number(v) * (i + 1) as f64)
                    .sum(),
            )
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_REGISTER_ARG_LIMIT;
    use crate::corruption::DEFAULT_LENGTH_THRESHOLD;

    fn expected_at_first_checkpoint(id: &str) -> Value {
        let specs = scenarios(&CatalogConfig::default()).unwrap();
        let spec = specs.iter().find(|s| s.id == id).unwrap();
        spec.expected_at(&spec.checkpoints[0])
    }

    #[test]
    fn arity_sweep_brackets_the_register_limit() {
        assert_eq!(arities(6), [4, 5, 6, 7, 8, 9]);
        assert_eq!(arities(1), [1, 2, 3, 4, 7]);
        assert_eq!(arities(10), [7, 8, 9, 10, 11, 12, 13]);
    }

    #[test]
    fn oracles_match_hand_computed_values() {
        assert_eq!(expected_at_first_checkpoint("arity/sum7"), Value::int(28));
        assert_eq!(expected_at_first_checkpoint("arity/probe7"), Value::str("2,3,4,5,6,7|140"));
        assert_eq!(expected_at_first_checkpoint("arity/fsum7"), Value::Number(31.5));
        assert_eq!(expected_at_first_checkpoint("arity/strtail7"), Value::str("tail:21"));
        // 1*1 + 2*2 + ... + 7*7
        assert_eq!(expected_at_first_checkpoint("arity/nested7"), Value::int(140));
    }

    #[test]
    fn sources_define_the_invoked_function() {
        for spec in scenarios(&CatalogConfig::default()).unwrap() {
            let header = format!("function {}(", spec.invocation.function);
            assert!(spec.invocation.source.contains(&header), "{}", spec.id);
            assert_eq!(spec.arity, spec.invocation.argument_sets[0].len());
        }
    }

    #[test]
    fn string_results_stay_below_the_corruption_threshold() {
        for register_arg_limit in [1, 6, 18, 32, MAX_REGISTER_ARG_LIMIT] {
            let config = CatalogConfig {
                register_arg_limit,
                ..CatalogConfig::default()
            };
            for spec in scenarios(&config).unwrap() {
                if spec.result_kind == ResultKind::String {
                    let text = spec.expected_at(&spec.checkpoints[0]).text();
                    assert!(
                        text.len() <= DEFAULT_LENGTH_THRESHOLD,
                        "limit {register_arg_limit}, {}: {text}",
                        spec.id
                    );
                }
            }
        }
    }

    #[test]
    fn echoed_slots_cover_short_signatures_whole() {
        assert_eq!(expected_at_first_checkpoint("arity/probe4"), Value::str("1,2,3,4|30"));
        let config = CatalogConfig {
            register_arg_limit: MAX_REGISTER_ARG_LIMIT,
            ..CatalogConfig::default()
        };
        let specs = scenarios(&config).unwrap();
        let spec = specs.iter().find(|s| s.id == "arity/probe67").unwrap();
        // sum of i * i for i in 1..=67
        assert_eq!(
            spec.expected_at(&spec.checkpoints[0]),
            Value::str("62,63,64,65,66,67|102510")
        );
    }
}
