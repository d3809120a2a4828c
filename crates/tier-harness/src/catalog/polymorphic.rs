//! Polymorphic dispatch scenarios: a function specialized for one typed-array element type is
//! suddenly handed other element types with no warm-up in between.

use super::CatalogConfig;
use crate::error::Result;
use crate::scenario::{Family, ScenarioSpec};
use crate::schedule::TierCheckpoint;
use crate::value::{ElementType, ParamKind, ResultKind, Value};

const LEN: usize = 8;
const FILL_VALUE: f64 = -1.5;

/// Warm-up type followed by the types it is re-invoked with, in order.
const ROTATIONS: [(ElementType, [ElementType; 3]); 2] = [
    (
        ElementType::Float32,
        [ElementType::Float64, ElementType::Int32, ElementType::Uint8],
    ),
    (
        ElementType::Int32,
        [ElementType::Float64, ElementType::Uint8, ElementType::Float32],
    ),
];

#[derive(Clone, Copy)]
enum Shape {
    /// Allocate through the constructor argument, write, then read back.
    Construct,
    /// Read a per-type cached fixture element by element.
    Read,
    /// `fill` then read both ends.
    Fill,
}

impl Shape {
    const ALL: [Shape; 3] = [Shape::Construct, Shape::Read, Shape::Fill];

    fn name(self) -> &'static str {
        match self {
            Shape::Construct => "construct",
            Shape::Read => "read",
            Shape::Fill => "fill",
        }
    }

    fn function(self) -> &'static str {
        match self {
            Shape::Construct => "createAndFill",
            Shape::Read => "readElements",
            Shape::Fill => "fillEnds",
        }
    }

    fn source(self) -> String {
        match self {
            Shape::Construct => "function createAndFill(C, n) {\n  var a = new C(n);\n  for (var i = 0; i < n; i++) {\n    a[i] = i + 1;\n  }\n  var s = 0;\n  for (var j = 0; j < n; j++) {\n    s += a[j];\n  }\n  return s;\n}".to_string(),
            Shape::Read => "var readCache = {};\nfunction readFixture(C, n) {\n  var a = readCache[C.name];\n  if (!a) {\n    a = new C(n);\n    for (var i = 0; i < n; i++) {\n      a[i] = i * 3 + 1;\n    }\n    readCache[C.name] = a;\n  }\n  return a;\n}\nfunction readElements(C, n) {\n  var a = readFixture(C, n);\n  var s = 0;\n  for (var i = 0; i < a.length; i++) {\n    s += a[i] * (i + 1);\n  }\n  return s;\n}".to_string(),
            Shape::Fill => format!("function fillEnds(C, n) {{\n  var a = new C(n);\n  a.fill({FILL_VALUE});\n  return a[0] + a[n - 1];\n}}"),
        }
    }

    fn expected(self, ty: ElementType, n: usize) -> f64 {
        match self {
            Shape::Construct => (0..n).map(|i| ty.coerce(i as f64 + 1.0)).sum(),
            Shape::Read => (0..n)
                .map(|i| ty.coerce(i as f64 * 3.0 + 1.0) * (i as f64 + 1.0))
                .sum(),
            Shape::Fill if n == 0 => f64::NAN,
            Shape::Fill => 2.0 * ty.coerce(FILL_VALUE),
        }
    }
}

fn short_name(ty: ElementType) -> String {
    ty.constructor_name()
        .trim_end_matches("Array")
        .to_ascii_lowercase()
}

pub(super) fn scenarios(config: &CatalogConfig) -> Result<Vec<ScenarioSpec>> {
    let mut out = Vec::new();
    for shape in Shape::ALL {
        for (warm, retypes) in ROTATIONS {
            out.push(scenario(config, shape, warm, retypes)?);
        }
    }
    Ok(out)
}

fn scenario(
    config: &CatalogConfig,
    shape: Shape,
    warm: ElementType,
    retypes: [ElementType; 3],
) -> Result<ScenarioSpec> {
    let id = format!("polymorphic/{}-from-{}", shape.name(), short_name(warm));
    let mut builder = ScenarioSpec::builder(id, Family::Polymorphic)
        .describe(format!(
            "{} warmed on {warm}, then called once each with {}, {} and {}",
            shape.function(),
            retypes[0],
            retypes[1],
            retypes[2]
        ))
        .params([ParamKind::TypedArray(warm), ParamKind::Integer])
        .returns(ResultKind::Float)
        .source(shape.function(), shape.source())
        .arguments(vec![Value::Constructor(warm), Value::int(LEN as i64)])
        .schedule(&config.schedule);

    let warmed = config.schedule.warmup_iterations();
    for (idx, ty) in retypes.into_iter().enumerate() {
        builder = builder
            .arguments(vec![Value::Constructor(ty), Value::int(LEN as i64)])
            .checkpoint(
                TierCheckpoint::new(format!("retype:{ty}"), warmed + idx as u64 + 1)
                    .with_argument_set(idx + 1),
            );
    }

    builder
        .oracle(move |args| match args {
            [Value::Constructor(ty), Value::Number(n)] if *n >= 0.0 => {
                Value::Number(shape.expected(*ty, *n as usize))
            }
            _ => Value::Undefined,
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> Vec<ScenarioSpec> {
        scenarios(&CatalogConfig::default()).unwrap()
    }

    #[test]
    fn retype_checkpoints_follow_the_full_schedule() {
        let spec = all()
            .into_iter()
            .find(|s| s.id == "polymorphic/construct-from-float32")
            .unwrap();
        let names: Vec<_> = spec.checkpoints.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "interpreted",
                "warm",
                "simple-jit",
                "full-jit",
                "full-jit-steady",
                "retype:Float64Array",
                "retype:Int32Array",
                "retype:Uint8Array"
            ]
        );
        let tail: Vec<_> = spec.checkpoints[5..].iter().map(|c| c.iterations).collect();
        assert_eq!(tail, [5001, 5002, 5003]);
        assert_eq!(spec.checkpoints[7].argument_set, 3);
    }

    #[test]
    fn expected_values_follow_element_coercion() {
        // 1 + 2 + ... + 8
        assert_eq!(Shape::Construct.expected(ElementType::Uint8, 8), 36.0);
        assert_eq!(Shape::Fill.expected(ElementType::Float32, 8), -3.0);
        assert_eq!(Shape::Fill.expected(ElementType::Int32, 8), -2.0);
        assert_eq!(Shape::Fill.expected(ElementType::Uint8, 8), 510.0);
        // sum of (3i + 1)(i + 1) for i in 0..8
        assert_eq!(Shape::Read.expected(ElementType::Float64, 8), 540.0);
    }

    #[test]
    fn each_shape_covers_both_rotations() {
        let ids: Vec<_> = all().into_iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), 6);
        assert!(ids.contains(&"polymorphic/fill-from-int32".to_string()));
        assert!(ids.contains(&"polymorphic/read-from-float32".to_string()));
    }
}
