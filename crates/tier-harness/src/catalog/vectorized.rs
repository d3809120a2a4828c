//! Vectorized-path scenarios: typed-array builtins whose compiled forms process whole vector
//! chunks and finish with a scalar tail. Lengths bracket one chunk so both the empty, the
//! tail-only and the chunk-plus-tail paths run. NaN and `-0` are stored, searched for and
//! ordered, since float and integer element types treat them differently.

use super::CatalogConfig;
use crate::error::Result;
use crate::scenario::{Family, ScenarioSpec};
use crate::value::{ElementType, ParamKind, ResultKind, Value};

pub(super) const ELEMENT_TYPES: [ElementType; 9] = ElementType::ALL;

/// Stored by `fill`; the fraction is dropped by the integer types.
const FILL: f64 = 100.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Fill,
    PartialFill,
    FillNaN,
    FillNegZero,
    FillIndexOf,
    TailSearch,
    IndexOfNegZero,
    IndexOfNaN,
    IncludesNaN,
    CopySet,
    Reduce,
    MinNegZero,
    MaxNaN,
}

impl Op {
    const ALL: [Op; 13] = [
        Op::Fill,
        Op::PartialFill,
        Op::FillNaN,
        Op::FillNegZero,
        Op::FillIndexOf,
        Op::TailSearch,
        Op::IndexOfNegZero,
        Op::IndexOfNaN,
        Op::IncludesNaN,
        Op::CopySet,
        Op::Reduce,
        Op::MinNegZero,
        Op::MaxNaN,
    ];

    fn name(self) -> &'static str {
        match self {
            Op::Fill => "fill",
            Op::PartialFill => "partial-fill",
            Op::FillNaN => "fill-nan",
            Op::FillNegZero => "fill-negzero",
            Op::FillIndexOf => "fill-indexof",
            Op::TailSearch => "tail-search",
            Op::IndexOfNegZero => "indexof-negzero",
            Op::IndexOfNaN => "indexof-nan",
            Op::IncludesNaN => "includes-nan",
            Op::CopySet => "copy-set",
            Op::Reduce => "reduce",
            Op::MinNegZero => "min-negzero",
            Op::MaxNaN => "max-nan",
        }
    }

    fn function(self) -> &'static str {
        match self {
            Op::Fill => "vecFill",
            Op::PartialFill => "vecPartialFill",
            Op::FillNaN => "vecFillNaN",
            Op::FillNegZero => "vecFillNegZero",
            Op::FillIndexOf => "vecFillIndexOf",
            Op::TailSearch => "vecTailSearch",
            Op::IndexOfNegZero => "vecIndexOfNegZero",
            Op::IndexOfNaN => "vecIndexOfNaN",
            Op::IncludesNaN => "vecIncludesNaN",
            Op::CopySet => "vecCopySet",
            Op::Reduce => "vecReduce",
            Op::MinNegZero => "vecMinNegZero",
            Op::MaxNaN => "vecMaxNaN",
        }
    }

    fn result_kind(self) -> ResultKind {
        match self {
            Op::FillIndexOf | Op::TailSearch | Op::IndexOfNegZero | Op::IndexOfNaN => {
                ResultKind::Integer
            }
            Op::IncludesNaN => ResultKind::Boolean,
            Op::Fill
            | Op::PartialFill
            | Op::FillNaN
            | Op::FillNegZero
            | Op::CopySet
            | Op::Reduce
            | Op::MinNegZero
            | Op::MaxNaN => ResultKind::Float,
        }
    }

    /// Results where `-0` and `+0` must be told apart.
    fn signed_zero(self) -> bool {
        matches!(self, Op::FillNegZero | Op::MinNegZero | Op::MaxNaN)
    }

    /// Every function takes the constructor, the length and the value `fill` leaves behind.
    fn source(self) -> String {
        match self {
            Op::Fill => format!(
                "function vecFill(C, n, v) {{\n  var a = new C(n);\n  a.fill({FILL});\n  var s = 0;\n  for (var i = 0; i < n; i++) {{\n    s += a[i];\n  }}\n  return s;\n}}"
            ),
            Op::PartialFill => format!(
                "function vecPartialFill(C, n, v) {{\n  var a = new C(n);\n  a.fill(0);\n  a.fill({FILL}, 1, n - 1);\n  var s = 0;\n  for (var i = 0; i < n; i++) {{\n    s += a[i];\n  }}\n  return s;\n}}"
            ),
            Op::FillNaN => "function vecFillNaN(C, n, v) {\n  var a = new C(n);\n  a.fill(NaN);\n  var s = 0;\n  for (var i = 0; i < n; i++) {\n    s += a[i];\n  }\n  return s;\n}".to_string(),
            Op::FillNegZero => "function vecFillNegZero(C, n, v) {\n  var a = new C(n);\n  a.fill(-0);\n  var s = -0;\n  for (var i = 0; i < n; i++) {\n    s += a[i];\n  }\n  return s;\n}".to_string(),
            Op::FillIndexOf => format!(
                "function vecFillIndexOf(C, n, v) {{\n  var a = new C(n);\n  a.fill({FILL});\n  return a.indexOf(v);\n}}"
            ),
            Op::TailSearch => "function vecTailSearch(C, n, v) {\n  var a = new C(n);\n  if (n > 0) {\n    a[n - 1] = v;\n  }\n  return a.indexOf(v);\n}".to_string(),
            Op::IndexOfNegZero => "function vecIndexOfNegZero(C, n, v) {\n  var a = new C(n);\n  a.fill(1);\n  if (n > 0) {\n    a[n - 1] = -0;\n  }\n  return a.indexOf(0);\n}".to_string(),
            Op::IndexOfNaN => "function vecIndexOfNaN(C, n, v) {\n  var a = new C(n);\n  a.fill(NaN);\n  return a.indexOf(NaN);\n}".to_string(),
            Op::IncludesNaN => "function vecIncludesNaN(C, n, v) {\n  var a = new C(n);\n  a.fill(NaN);\n  return a.includes(NaN);\n}".to_string(),
            Op::CopySet => "function vecCopySet(C, n, v) {\n  var src = new C(n);\n  for (var i = 0; i < n; i++) {\n    src[i] = i + 1;\n  }\n  var dst = new C(n + 1);\n  dst.set(src, 1);\n  var s = 0;\n  for (var j = 0; j < dst.length; j++) {\n    s += dst[j] * (j + 1);\n  }\n  return s;\n}".to_string(),
            Op::Reduce => "function vecReduce(C, n, v) {\n  var a = new C(n);\n  for (var i = 0; i < n; i++) {\n    a[i] = i + 0.5;\n  }\n  return a.reduce(function (acc, x) {\n    return acc + x;\n  }, 0);\n}".to_string(),
            Op::MinNegZero => "function vecMinNegZero(C, n, v) {\n  var a = new C(n);\n  for (var i = 0; i < n; i++) {\n    a[i] = n - i;\n  }\n  if (n > 0) {\n    a[0] = 0;\n    a[n - 1] = -0;\n  }\n  var m = Infinity;\n  for (var j = 0; j < n; j++) {\n    var x = a[j];\n    if (x !== x) return NaN;\n    if (x < m || (x === 0 && m === 0 && 1 / x < 1 / m)) m = x;\n  }\n  return m;\n}".to_string(),
            Op::MaxNaN => "function vecMaxNaN(C, n, v) {\n  var a = new C(n);\n  for (var i = 0; i < n; i++) {\n    a[i] = i - 1;\n  }\n  if (n > 1) {\n    a[n >> 1] = NaN;\n  }\n  var m = -Infinity;\n  for (var j = 0; j < n; j++) {\n    var x = a[j];\n    if (x !== x) return NaN;\n    if (x > m || (x === 0 && m === 0 && 1 / x > 1 / m)) m = x;\n  }\n  return m;\n}".to_string(),
        }
    }

    fn expected(self, ty: ElementType, n: usize) -> Value {
        let stored = ty.coerce(FILL);
        match self {
            Op::Fill => Value::Number(stored * n as f64),
            Op::PartialFill => Value::Number(stored * n.saturating_sub(2) as f64),
            Op::FillNaN => Value::Number((0..n).fold(0.0, |s, _| s + ty.coerce(f64::NAN))),
            Op::FillNegZero => Value::Number((0..n).fold(-0.0, |s, _| s + ty.coerce(-0.0))),
            Op::FillIndexOf => Value::int(if n > 0 { 0 } else { -1 }),
            Op::TailSearch | Op::IndexOfNegZero => Value::int(n as i64 - 1),
            Op::IndexOfNaN => Value::int(-1),
            Op::IncludesNaN => Value::Bool(ty.is_float() && n > 0),
            Op::CopySet => Value::Number(
                (0..n)
                    .map(|i| ty.coerce(i as f64 + 1.0) * (i as f64 + 2.0))
                    .sum(),
            ),
            Op::Reduce => Value::Number((0..n).map(|i| ty.coerce(i as f64 + 0.5)).sum()),
            Op::MinNegZero => {
                let mut a: Vec<f64> = (0..n).map(|i| (n - i) as f64).collect();
                if n > 0 {
                    a[0] = 0.0;
                    a[n - 1] = -0.0;
                }
                Value::Number(js_min(a.into_iter().map(|x| ty.coerce(x))))
            }
            Op::MaxNaN => {
                let mut a: Vec<f64> = (0..n).map(|i| i as f64 - 1.0).collect();
                if n > 1 {
                    a[n >> 1] = f64::NAN;
                }
                Value::Number(js_max(a.into_iter().map(|x| ty.coerce(x))))
            }
        }
    }
}

/// Minimum with NaN propagation and `-0 < +0`.
fn js_min(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut m = f64::INFINITY;
    for x in values {
        if x.is_nan() {
            return f64::NAN;
        }
        if x < m || (x == 0.0 && m == 0.0 && x.is_sign_negative() && m.is_sign_positive()) {
            m = x;
        }
    }
    m
}

/// Maximum with NaN propagation and `+0 > -0`.
fn js_max(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut m = f64::NEG_INFINITY;
    for x in values {
        if x.is_nan() {
            return f64::NAN;
        }
        if x > m || (x == 0.0 && m == 0.0 && x.is_sign_positive() && m.is_sign_negative()) {
            m = x;
        }
    }
    m
}

/// 0, 1, lanes - 1, lanes, lanes + 1; deduplicated for types with fewer than three lanes.
pub(super) fn lengths(ty: ElementType, chunk_bytes: usize) -> Vec<usize> {
    let lanes = ty.lanes(chunk_bytes);
    let mut out = vec![0, 1, lanes - 1, lanes, lanes + 1];
    out.sort_unstable();
    out.dedup();
    out
}

fn short_name(ty: ElementType) -> String {
    ty.constructor_name()
        .trim_end_matches("Array")
        .to_ascii_lowercase()
}

pub(super) fn scenarios(config: &CatalogConfig) -> Result<Vec<ScenarioSpec>> {
    let mut out = Vec::new();
    for op in Op::ALL {
        for ty in ELEMENT_TYPES {
            for n in lengths(ty, config.vector_chunk_bytes) {
                out.push(scenario(config, op, ty, n)?);
            }
        }
    }
    Ok(out)
}

fn scenario(config: &CatalogConfig, op: Op, ty: ElementType, n: usize) -> Result<ScenarioSpec> {
    let id = format!("vectorized/{}-{}-len{n}", op.name(), short_name(ty));
    let builder = ScenarioSpec::builder(id, Family::Vectorized)
        .describe(format!(
            "{} on a {n}-element {ty} ({} lanes per chunk)",
            op.name(),
            ty.lanes(config.vector_chunk_bytes)
        ))
        .params([ParamKind::TypedArray(ty), ParamKind::Integer, ParamKind::Float])
        .returns(op.result_kind())
        .source(op.function(), op.source())
        .arguments(vec![
            Value::Constructor(ty),
            Value::int(n as i64),
            Value::Number(ty.coerce(FILL)),
        ])
        .schedule(&config.schedule)
        .oracle(move |args| match args {
            [Value::Constructor(ty), Value::Number(n), _] if *n >= 0.0 => {
                op.expected(*ty, *n as usize)
            }
            _ => Value::Undefined,
        });
    if op.signed_zero() {
        builder.zero_sign().build()
    } else {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_bracket_one_chunk() {
        assert_eq!(lengths(ElementType::Int8, 16), [0, 1, 15, 16, 17]);
        assert_eq!(lengths(ElementType::Int32, 16), [0, 1, 3, 4, 5]);
        assert_eq!(lengths(ElementType::Float64, 16), [0, 1, 2, 3]);
        assert_eq!(lengths(ElementType::Float64, 8), [0, 1, 2]);
    }

    #[test]
    fn fill_then_index_of_finds_the_first_element() {
        for ty in ELEMENT_TYPES {
            for n in lengths(ty, 16) {
                let expected = Op::FillIndexOf.expected(ty, n);
                assert_eq!(expected, Value::int(if n == 0 { -1 } else { 0 }), "{ty} {n}");
            }
        }
    }

    #[test]
    fn expectations_follow_element_storage() {
        assert_eq!(Op::Fill.expected(ElementType::Int8, 3), Value::Number(300.0));
        assert_eq!(Op::Fill.expected(ElementType::Float64, 2), Value::Number(201.0));
        assert_eq!(Op::TailSearch.expected(ElementType::Uint8, 17), Value::int(16));
        // dst = [0, 1, 2, 3] weighted by position 1..=4
        assert_eq!(Op::CopySet.expected(ElementType::Int16, 3), Value::Number(20.0));
        assert_eq!(Op::Reduce.expected(ElementType::Int32, 4), Value::Number(6.0));
        assert_eq!(Op::Reduce.expected(ElementType::Float32, 4), Value::Number(8.0));
    }

    #[test]
    fn nan_and_signed_zero_follow_element_storage() {
        let neg_zero = |v: Value| matches!(v, Value::Number(x) if x == 0.0 && x.is_sign_negative());
        let pos_zero = |v: Value| matches!(v, Value::Number(x) if x == 0.0 && x.is_sign_positive());

        assert!(neg_zero(Op::FillNegZero.expected(ElementType::Float32, 4)));
        assert!(pos_zero(Op::FillNegZero.expected(ElementType::Int16, 4)));
        assert!(neg_zero(Op::FillNegZero.expected(ElementType::Uint8, 0)));
        assert!(matches!(Op::FillNaN.expected(ElementType::Float64, 3), Value::Number(x) if x.is_nan()));
        assert_eq!(Op::FillNaN.expected(ElementType::Uint8Clamped, 3), Value::Number(0.0));

        assert_eq!(Op::IndexOfNaN.expected(ElementType::Float32, 5), Value::int(-1));
        assert_eq!(Op::IndexOfNegZero.expected(ElementType::Float64, 3), Value::int(2));
        assert_eq!(Op::IncludesNaN.expected(ElementType::Float64, 1), Value::Bool(true));
        assert_eq!(Op::IncludesNaN.expected(ElementType::Float64, 0), Value::Bool(false));
        assert_eq!(Op::IncludesNaN.expected(ElementType::Int32, 4), Value::Bool(false));
    }

    #[test]
    fn min_and_max_order_zeros_and_propagate_nan() {
        assert!(matches!(
            Op::MinNegZero.expected(ElementType::Float64, 3),
            Value::Number(x) if x == 0.0 && x.is_sign_negative()
        ));
        assert!(matches!(
            Op::MinNegZero.expected(ElementType::Int32, 3),
            Value::Number(x) if x == 0.0 && x.is_sign_positive()
        ));
        assert_eq!(Op::MinNegZero.expected(ElementType::Int8, 0), Value::Number(f64::INFINITY));
        assert!(matches!(Op::MaxNaN.expected(ElementType::Float32, 2), Value::Number(x) if x.is_nan()));
        // [-1, 0 (NaN stored as 0), 1]
        assert_eq!(Op::MaxNaN.expected(ElementType::Int8, 3), Value::Number(1.0));
        // -1 wraps to the top of the unsigned range
        assert_eq!(Op::MaxNaN.expected(ElementType::Uint16, 1), Value::Number(65535.0));
        assert_eq!(Op::MaxNaN.expected(ElementType::Uint8Clamped, 1), Value::Number(0.0));
        assert_eq!(Op::MaxNaN.expected(ElementType::Float64, 1), Value::Number(-1.0));
        assert!(js_max([-0.0, 0.0, -0.0]).is_sign_positive());
        assert!(js_min([0.0, -0.0, 0.0]).is_sign_negative());
    }

    #[test]
    fn partial_fill_leaves_both_ends_zero() {
        assert_eq!(Op::PartialFill.expected(ElementType::Int32, 5), Value::Number(300.0));
        assert_eq!(Op::PartialFill.expected(ElementType::Float64, 1), Value::Number(0.0));
        assert_eq!(Op::PartialFill.expected(ElementType::Uint8Clamped, 4), Value::Number(200.0));
    }

    #[test]
    fn signed_zero_ops_compare_zero_sign() {
        let specs = scenarios(&CatalogConfig::default()).unwrap();
        let min = specs
            .iter()
            .find(|s| s.id == "vectorized/min-negzero-float32-len3")
            .unwrap();
        assert!(min.zero_sign);
        let fill = specs.iter().find(|s| s.id == "vectorized/fill-int8-len1").unwrap();
        assert!(!fill.zero_sign);
    }

    #[test]
    fn catalog_covers_every_op_type_and_length() {
        let specs = scenarios(&CatalogConfig::default()).unwrap();
        let per_op: usize = ELEMENT_TYPES.iter().map(|ty| lengths(*ty, 16).len()).sum();
        assert_eq!(specs.len(), Op::ALL.len() * per_op);
        assert!(specs.iter().any(|s| s.id == "vectorized/fill-indexof-int8-len17"));
        assert!(specs.iter().any(|s| s.id == "vectorized/reduce-float64-len0"));
        assert!(specs.iter().any(|s| s.id == "vectorized/includes-nan-uint8clamped-len17"));
        assert!(specs.iter().any(|s| s.id == "vectorized/fill-uint32-len5"));
    }
}
