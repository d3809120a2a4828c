//! Generation of the JS probe script fed to the SUT for one scenario.
//!
//! The script defines the scenario's function, hoists every argument set into globals (so the
//! call site is a plain direct call with a stable shape), then runs one counted loop per
//! checkpoint and reports the last result of each loop through the sentinel protocol.

use std::fmt::Write as _;

use crate::scenario::ScenarioSpec;
use crate::sentinel::{CHECKPOINT_PREFIX, DONE_LINE, FAULT_PREFIX, RESULT_PREFIX};

/// Header line listing a checkpoint, one per checkpoint, in schedule order.
pub const CHECKPOINT_HEADER: &str = "// checkpoint: ";
pub const SCENARIO_HEADER: &str = "// tierprobe scenario: ";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeScript {
    pub scenario_id: String,
    pub checkpoints: Vec<String>,
    pub source: String,
}

impl ProbeScript {
    /// File name safe for any scenario id (`arity/sum7` -> `arity_sum7.js`).
    pub fn file_name(&self) -> String {
        let stem: String = self
            .scenario_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{stem}.js")
    }

    pub fn for_scenario(spec: &ScenarioSpec) -> Self {
        let mut src = String::new();
        let _ = writeln!(src, "{SCENARIO_HEADER}{}", spec.id);
        for cp in &spec.checkpoints {
            let _ = writeln!(src, "{CHECKPOINT_HEADER}{}", cp.name);
        }
        src.push_str(&runtime_prelude());
        src.push('\n');
        src.push_str(spec.invocation.source.trim());
        src.push_str("\n\n");

        for (set_idx, args) in spec.invocation.argument_sets.iter().enumerate() {
            for (arg_idx, arg) in args.iter().enumerate() {
                let _ = writeln!(src, "var {} = {};", arg_name(set_idx, arg_idx), arg.to_literal());
            }
        }

        src.push_str("\nfunction __tp_run() {\n  var __tp_r;\n  var __tp_i;\n");
        let mut done = 0u64;
        for cp in &spec.checkpoints {
            let delta = cp.iterations.saturating_sub(done);
            done = cp.iterations;
            let call = call_expr(&spec.invocation.function, cp.argument_set, spec.arity);
            let name = js_string(&cp.name);
            let _ = writeln!(
                src,
                "  try {{\n    for (__tp_i = 0; __tp_i < {delta}; __tp_i++) {{\n      __tp_r = {call};\n    }}\n  }} catch (__tp_e) {{\n    __tp_fault({name}, __tp_e);\n    return false;\n  }}\n  __tp_emit({name}, __tp_r);"
            );
        }
        src.push_str("  return true;\n}\n\n");
        let _ = writeln!(src, "if (__tp_run()) {{\n  __tp_print({});\n}}", js_string(DONE_LINE));

        Self {
            scenario_id: spec.id.clone(),
            checkpoints: spec.checkpoints.iter().map(|c| c.name.clone()).collect(),
            source: src,
        }
    }
}

/// Helpers shared by every generated script: output, value description, sentinel emission.
pub fn runtime_prelude() -> String {
    format!(
        r#"
var __tp_print = (typeof print === "function") ? print
  : (typeof console !== "undefined") ? function (s) {{ console.log(s); }}
  : function () {{}};

function __tp_describe(v) {{
  if (v === null) return ["null", "null"];
  var t = typeof v;
  if (t === "number") return ["number", (v === 0 && 1 / v < 0) ? "-0" : String(v)];
  if (t === "object") {{
    try {{
      var j = JSON.stringify(v);
      if (j !== undefined) return ["object", j];
    }} catch (e) {{}}
    return ["object", Object.prototype.toString.call(v)];
  }}
  if (t === "symbol") return ["symbol", v.toString()];
  return [t, String(v)];
}}

function __tp_emit(cp, v) {{
  var d = __tp_describe(v);
  __tp_print({checkpoint} + cp);
  __tp_print({result} + d[0] + ":" + JSON.stringify(d[1]));
}}

function __tp_fault(cp, e) {{
  var m;
  try {{
    m = (e && e.stack) ? String(e.stack) : String(e);
  }} catch (x) {{
    m = "<unprintable exception>";
  }}
  __tp_print({fault} + cp + ":" + JSON.stringify(m));
}}
"#,
        checkpoint = js_string(CHECKPOINT_PREFIX),
        result = js_string(RESULT_PREFIX),
        fault = js_string(FAULT_PREFIX),
    )
}

fn arg_name(set_idx: usize, arg_idx: usize) -> String {
    format!("__tp_a{set_idx}_{arg_idx}")
}

fn call_expr(function: &str, set_idx: usize, arity: usize) -> String {
    let args = (0..arity)
        .map(|i| arg_name(set_idx, i))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{function}({args})")
}

pub(crate) fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}
