//! Type-aware equality between what the SUT produced and what the oracle expects.

use crate::value::{ResultKind, Value};
use crate::verdict::VerdictKind;

pub const DEFAULT_FLOAT_TOLERANCE: f64 = 1e-4;

/// Per-comparison options, taken from the scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompareOptions {
    pub kind: ResultKind,
    pub zero_sign: bool,
}

impl CompareOptions {
    pub fn new(kind: ResultKind) -> Self {
        Self {
            kind,
            zero_sign: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct OracleComparator {
    tolerance: f64,
}

impl Default for OracleComparator {
    fn default() -> Self {
        Self::new(DEFAULT_FLOAT_TOLERANCE)
    }
}

impl OracleComparator {
    /// `tolerance` is relative; negative or NaN values are treated as exact comparison.
    pub fn new(tolerance: f64) -> Self {
        let tolerance = if tolerance.is_finite() && tolerance > 0.0 {
            tolerance
        } else {
            0.0
        };
        Self { tolerance }
    }

    /// Returns [`VerdictKind::Pass`] or [`VerdictKind::WrongValue`]. Never panics.
    pub fn compare(&self, actual: &Value, expected: &Value, opts: CompareOptions) -> VerdictKind {
        if self.equivalent(actual, expected, opts) {
            VerdictKind::Pass
        } else {
            VerdictKind::WrongValue
        }
    }

    fn equivalent(&self, actual: &Value, expected: &Value, opts: CompareOptions) -> bool {
        match (actual, expected) {
            (Value::Number(a), Value::Number(b)) => match opts.kind {
                ResultKind::Float => self.floats_equal(*a, *b, opts.zero_sign),
                _ => exact_numbers_equal(*a, *b, opts.zero_sign),
            },
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Constructor(a), Value::Constructor(b)) => a == b,
            (Value::Object(a), Value::Object(b)) | (Value::Function(a), Value::Function(b)) => {
                a == b
            }
            (
                Value::Other { kind: ka, text: ta },
                Value::Other { kind: kb, text: tb },
            ) => ka == kb && ta == tb,
            _ => false,
        }
    }

    fn floats_equal(&self, a: f64, b: f64, zero_sign: bool) -> bool {
        if a.is_nan() || b.is_nan() {
            return a.is_nan() && b.is_nan();
        }
        if a == 0.0 && b == 0.0 {
            return !zero_sign || a.is_sign_negative() == b.is_sign_negative();
        }
        if a == b {
            return true;
        }
        if a.is_infinite() || b.is_infinite() {
            return false;
        }
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() <= self.tolerance * scale
    }
}

fn exact_numbers_equal(a: f64, b: f64, zero_sign: bool) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    if a == 0.0 && b == 0.0 {
        return !zero_sign || a.is_sign_negative() == b.is_sign_negative();
    }
    a == b
}
