//! Detection of "impossible" results that betray a register/stack-slot aliasing bug.
//!
//! When a JIT tier reads an argument from the wrong slot the callee frequently sees a live
//! function object (often the callee itself) instead of the number or string it was passed. The
//! value still stringifies cleanly, so a plain comparison would report an ordinary wrong value.

use std::fmt;

use crate::value::{ResultKind, Value};

pub const DEFAULT_LENGTH_THRESHOLD: usize = 50;

const SOURCE_PREFIXES: [&str; 4] = ["function", "async function", "class ", "(function"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CorruptionSignal {
    /// The runtime reported the value as callable.
    Callable,
    /// Text starts like a function or class definition.
    FunctionSource,
    /// Text carries source-code tokens (`[native code]`, arrows, `return` inside braces).
    SourceTokens(&'static str),
    /// Text is longer than any legitimate scalar result.
    ExceedsLength { len: usize, threshold: usize },
}

impl fmt::Display for CorruptionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorruptionSignal::Callable => f.write_str("value is callable"),
            CorruptionSignal::FunctionSource => f.write_str("value text is function source"),
            CorruptionSignal::SourceTokens(token) => {
                write!(f, "value text contains source token {token:?}")
            }
            CorruptionSignal::ExceedsLength { len, threshold } => {
                write!(f, "value text is {len} chars (threshold {threshold})")
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CorruptionDetector {
    length_threshold: usize,
}

impl Default for CorruptionDetector {
    fn default() -> Self {
        Self::new(DEFAULT_LENGTH_THRESHOLD)
    }
}

impl CorruptionDetector {
    pub fn new(length_threshold: usize) -> Self {
        Self { length_threshold }
    }

    /// Inspect a value already judged wrong by the comparator. Returns the reason when it looks
    /// like aliasing rather than a logic bug; `None` for kinds that are not scalar.
    pub fn inspect(&self, actual: &Value, declared: ResultKind) -> Option<CorruptionSignal> {
        if !declared.is_scalar() {
            return None;
        }
        if matches!(actual, Value::Function(_) | Value::Constructor(_)) {
            return Some(CorruptionSignal::Callable);
        }

        let text = actual.text();
        let trimmed = text.trim_start();
        if SOURCE_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            return Some(CorruptionSignal::FunctionSource);
        }
        if let Some(token) = source_token(trimmed) {
            return Some(CorruptionSignal::SourceTokens(token));
        }
        let len = text.chars().count();
        if len > self.length_threshold {
            return Some(CorruptionSignal::ExceedsLength {
                len,
                threshold: self.length_threshold,
            });
        }
        None
    }
}

fn source_token(text: &str) -> Option<&'static str> {
    if text.contains("[native code]") {
        return Some("[native code]");
    }
    if text.contains("=>") {
        return Some("=>");
    }
    if text.contains('{') && text.contains('}') && text.contains("return") {
        return Some("return");
    }
    None
}
