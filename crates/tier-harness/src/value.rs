//! Values crossing the SUT boundary.
//!
//! Arguments are rendered into probe scripts as JS literals, results come back through the
//! `RESULT:` sentinel as a `typeof` tag plus the value's textual form. Oracles compute expected
//! values as [`Value`]s too, so both sides of a comparison share one representation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// Fixed-width typed-array element types understood by the harness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementType {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl ElementType {
    pub const ALL: [ElementType; 9] = [
        ElementType::Int8,
        ElementType::Uint8,
        ElementType::Uint8Clamped,
        ElementType::Int16,
        ElementType::Uint16,
        ElementType::Int32,
        ElementType::Uint32,
        ElementType::Float32,
        ElementType::Float64,
    ];

    pub fn constructor_name(self) -> &'static str {
        match self {
            ElementType::Int8 => "Int8Array",
            ElementType::Uint8 => "Uint8Array",
            ElementType::Uint8Clamped => "Uint8ClampedArray",
            ElementType::Int16 => "Int16Array",
            ElementType::Uint16 => "Uint16Array",
            ElementType::Int32 => "Int32Array",
            ElementType::Uint32 => "Uint32Array",
            ElementType::Float32 => "Float32Array",
            ElementType::Float64 => "Float64Array",
        }
    }

    pub fn size_bytes(self) -> usize {
        match self {
            ElementType::Int8 | ElementType::Uint8 | ElementType::Uint8Clamped => 1,
            ElementType::Int16 | ElementType::Uint16 => 2,
            ElementType::Int32 | ElementType::Uint32 | ElementType::Float32 => 4,
            ElementType::Float64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }

    /// Number of elements that fit in one vector chunk of `chunk_bytes` (at least 1).
    pub fn lanes(self, chunk_bytes: usize) -> usize {
        (chunk_bytes / self.size_bytes()).max(1)
    }

    /// The value an element of this type holds after storing `v` into it.
    pub fn coerce(self, v: f64) -> f64 {
        match self {
            ElementType::Int8 => to_int_bits(v, 8, true),
            ElementType::Uint8 => to_int_bits(v, 8, false),
            ElementType::Uint8Clamped => to_uint8_clamped(v),
            ElementType::Int16 => to_int_bits(v, 16, true),
            ElementType::Uint16 => to_int_bits(v, 16, false),
            ElementType::Int32 => to_int_bits(v, 32, true),
            ElementType::Uint32 => to_int_bits(v, 32, false),
            ElementType::Float32 => (v as f32) as f64,
            ElementType::Float64 => v,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.constructor_name())
    }
}

// Modular integer conversion used by the integer typed arrays (ToInt8/ToUint8/...).
fn to_int_bits(v: f64, bits: i32, signed: bool) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    let modulus = 2f64.powi(bits);
    let mut m = v.trunc() % modulus;
    if m < 0.0 {
        m += modulus;
    }
    if signed && m >= modulus / 2.0 {
        m -= modulus;
    }
    // Normalize -0 to +0.
    m + 0.0
}

fn to_uint8_clamped(v: f64) -> f64 {
    if v.is_nan() || v <= 0.0 {
        return 0.0;
    }
    if v >= 255.0 {
        return 255.0;
    }
    let floor = v.floor();
    let frac = v - floor;
    if frac > 0.5 {
        floor + 1.0
    } else if frac < 0.5 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    }
}

/// Declared kind of one logical parameter of a scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Integer,
    Float,
    String,
    Object,
    TypedArray(ElementType),
}

/// Declared kind of a scenario's result. Drives both comparison and corruption detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    Integer,
    Float,
    String,
    Boolean,
    Object,
}

impl ResultKind {
    /// Kinds whose observable form is a short scalar, so a long or source-like text is suspect.
    pub fn is_scalar(self) -> bool {
        !matches!(self, ResultKind::Object)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    /// A typed-array constructor, only meaningful as an argument.
    Constructor(ElementType),
    /// Any non-callable object, carried as its textual (JSON) form.
    Object(String),
    /// A callable; the text is whatever the runtime prints for it (usually its source).
    Function(String),
    /// `symbol`, `bigint` and anything else the runtime reports.
    Other { kind: String, text: String },
}

impl Value {
    pub fn int(v: i64) -> Self {
        Value::Number(v as f64)
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Reconstruct a value from the `<typeof>` tag and text carried by a `RESULT:` sentinel.
    pub fn from_sentinel(kind: &str, text: &str) -> Result<Self> {
        let value = match kind {
            "undefined" => Value::Undefined,
            "null" => Value::Null,
            "boolean" => match text {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => {
                    return Err(HarnessError::malformed(
                        text,
                        format!("invalid boolean text {text:?}"),
                    ))
                }
            },
            "number" => Value::Number(parse_number(text).ok_or_else(|| {
                HarnessError::malformed(text, format!("invalid number text {text:?}"))
            })?),
            "string" => Value::Str(text.to_string()),
            "object" => Value::Object(text.to_string()),
            "function" => Value::Function(text.to_string()),
            "symbol" | "bigint" => Value::Other {
                kind: kind.to_string(),
                text: text.to_string(),
            },
            other => {
                return Err(HarnessError::malformed(
                    text,
                    format!("unknown value kind {other:?}"),
                ))
            }
        };
        Ok(value)
    }

    /// `typeof`-style name, used in diagnostics.
    pub fn kind_name(&self) -> &str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Constructor(_) | Value::Function(_) => "function",
            Value::Object(_) => "object",
            Value::Other { kind, .. } => kind,
        }
    }

    /// The externally observable textual form (what `String(v)` prints in the runtime).
    pub fn text(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_text(*n),
            Value::Str(s) => s.clone(),
            Value::Constructor(e) => format!("function {}() {{ [native code] }}", e),
            Value::Object(s) | Value::Function(s) => s.clone(),
            Value::Other { text, .. } => text.clone(),
        }
    }

    /// Render as a JS expression for embedding into a probe script.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_text(*n),
            Value::Str(s) => serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string()),
            Value::Constructor(e) => e.constructor_name().to_string(),
            Value::Object(src) | Value::Function(src) => format!("({src})"),
            Value::Other { text, .. } => text.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.text()),
        }
    }
}

/// Formats a number the way the probe sentinel reports it (`-0` keeps its sign).
pub fn number_text(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 && n.is_sign_negative() {
        "-0".to_string()
    } else {
        format!("{n}")
    }
}

fn parse_number(text: &str) -> Option<f64> {
    match text.trim() {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        "-0" => Some(-0.0),
        other if other.is_empty() => None,
        other => other.parse::<f64>().ok().filter(|n| n.is_finite()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn integer_element_types_wrap() {
        assert_eq!(ElementType::Int8.coerce(200.0), -56.0);
        assert_eq!(ElementType::Uint8.coerce(-3.0), 253.0);
        assert_eq!(ElementType::Uint8.coerce(256.0), 0.0);
        assert_eq!(ElementType::Int16.coerce(40000.0), -25536.0);
        assert_eq!(ElementType::Int32.coerce(2147483648.0), -2147483648.0);
        assert_eq!(ElementType::Uint32.coerce(-1.0), 4294967295.0);
        assert_eq!(ElementType::Int32.coerce(3.9), 3.0);
        assert_eq!(ElementType::Int32.coerce(-3.9), -3.0);
        assert_eq!(ElementType::Int32.coerce(f64::NAN), 0.0);
        assert!(ElementType::Int32.coerce(-0.0).is_sign_positive());
    }

    #[test]
    fn uint8_clamped_rounds_half_to_even() {
        assert_eq!(ElementType::Uint8Clamped.coerce(300.0), 255.0);
        assert_eq!(ElementType::Uint8Clamped.coerce(-5.0), 0.0);
        assert_eq!(ElementType::Uint8Clamped.coerce(1.5), 2.0);
        assert_eq!(ElementType::Uint8Clamped.coerce(2.5), 2.0);
        assert_eq!(ElementType::Uint8Clamped.coerce(2.6), 3.0);
        assert_eq!(ElementType::Uint8Clamped.coerce(f64::NAN), 0.0);
    }

    #[test]
    fn float32_rounds_through_single_precision() {
        let stored = ElementType::Float32.coerce(3.14);
        assert_ne!(stored, 3.14);
        assert_eq!(stored, 3.14f32 as f64);
        assert_eq!(ElementType::Float64.coerce(3.14), 3.14);
    }

    #[test]
    fn lanes_follow_element_width() {
        assert_eq!(ElementType::Uint8.lanes(16), 16);
        assert_eq!(ElementType::Int16.lanes(16), 8);
        assert_eq!(ElementType::Float32.lanes(16), 4);
        assert_eq!(ElementType::Float64.lanes(16), 2);
        assert_eq!(ElementType::Float64.lanes(4), 1);
    }

    #[test]
    fn sentinel_values_parse() {
        assert_eq!(
            Value::from_sentinel("number", "28").unwrap(),
            Value::Number(28.0)
        );
        let neg_zero = Value::from_sentinel("number", "-0").unwrap();
        match neg_zero {
            Value::Number(n) => assert!(n == 0.0 && n.is_sign_negative()),
            other => panic!("unexpected {other:?}"),
        }
        match Value::from_sentinel("number", "NaN").unwrap() {
            Value::Number(n) => assert!(n.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            Value::from_sentinel("number", "1e+21").unwrap(),
            Value::Number(1e21)
        );
        assert_eq!(
            Value::from_sentinel("function", "function f() {}").unwrap(),
            Value::Function("function f() {}".to_string())
        );
        assert_eq!(
            Value::from_sentinel("boolean", "true").unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn malformed_sentinel_values_are_rejected() {
        assert!(Value::from_sentinel("number", "twenty").is_err());
        assert!(Value::from_sentinel("number", "").is_err());
        assert!(Value::from_sentinel("boolean", "yes").is_err());
        assert!(Value::from_sentinel("widget", "x").is_err());
    }

    #[test]
    fn literals_render_as_js() {
        assert_eq!(Value::int(7).to_literal(), "7");
        assert_eq!(Value::Number(-0.0).to_literal(), "-0");
        assert_eq!(Value::Number(f64::NAN).to_literal(), "NaN");
        assert_eq!(Value::Number(1.5).to_literal(), "1.5");
        assert_eq!(Value::str("a\"b\n").to_literal(), "\"a\\\"b\\n\"");
        assert_eq!(
            Value::Constructor(ElementType::Float64).to_literal(),
            "Float64Array"
        );
    }

    proptest! {
        #[test]
        fn number_text_round_trips_through_sentinel(n in any::<f64>()) {
            let parsed = Value::from_sentinel("number", &number_text(n)).unwrap();
            match parsed {
                Value::Number(back) if n.is_nan() => prop_assert!(back.is_nan()),
                Value::Number(back) => {
                    prop_assert_eq!(back, n);
                    prop_assert_eq!(back.is_sign_negative(), n.is_sign_negative());
                }
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }

        #[test]
        fn integer_coercion_stays_in_range(v in -1.0e12f64..1.0e12) {
            prop_assert!((-128.0..=127.0).contains(&ElementType::Int8.coerce(v)));
            prop_assert!((0.0..=255.0).contains(&ElementType::Uint8.coerce(v)));
            prop_assert!((0.0..=255.0).contains(&ElementType::Uint8Clamped.coerce(v)));
            prop_assert!((0.0..=4294967295.0).contains(&ElementType::Uint32.coerce(v)));
        }
    }
}
