#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tier_harness::probe::ProbeScript;
use tier_harness::{ScenarioSpec, SutConfig, Value};

/// Replays prepared sentinel output. The probe (last argument) selects
/// `answers/<probe stem>.out` next to the script; a missing file makes the runtime exit 3.
const REPLAY_RUNTIME: &str = r#"#!/bin/sh
for probe; do :; done
answers="${0%/*}/answers"
stem=$(basename "$probe" .js)
if [ ! -f "$answers/$stem.out" ]; then
  echo "replay runtime: no answers for $stem" >&2
  exit 3
fi
echo "replay runtime 1.0"
cat "$answers/$stem.out"
"#;

/// A shell-script runtime whose stdout for each scenario is prepared by the test.
pub struct ReplayRuntime {
    dir: TempDir,
}

impl ReplayRuntime {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("tierprobe-replay-").tempdir()?;
        std::fs::create_dir(dir.path().join("answers"))?;
        let script = dir.path().join("runtime.sh");
        std::fs::write(&script, REPLAY_RUNTIME)?;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;
        Ok(Self { dir })
    }

    pub fn script(&self) -> PathBuf {
        self.dir.path().join("runtime.sh")
    }

    pub fn sut_config(&self) -> SutConfig {
        SutConfig::new(self.script())
    }

    fn answer_path(&self, spec: &ScenarioSpec) -> PathBuf {
        let probe = ProbeScript::for_scenario(spec);
        self.dir.path().join("answers").join(probe.file_name())
            .with_extension("out")
    }

    /// Answer every checkpoint of `spec` with `value_at(index, expected)`.
    pub fn answer_with(
        &self,
        spec: &ScenarioSpec,
        mut value_at: impl FnMut(usize, Value) -> Value,
    ) -> Result<()> {
        let mut out = String::new();
        for (idx, cp) in spec.checkpoints.iter().enumerate() {
            let value = value_at(idx, spec.expected_at(cp));
            out.push_str(&format!("CHECKPOINT:{}\n", cp.name));
            out.push_str(&result_line(&value)?);
            out.push('\n');
        }
        out.push_str("DONE\n");
        let path = self.answer_path(spec);
        std::fs::write(&path, out).with_context(|| format!("write {}", path.display()))
    }

    pub fn answer_faithfully(&self, spec: &ScenarioSpec) -> Result<()> {
        self.answer_with(spec, |_, expected| expected)
    }

    pub fn forget(&self, spec: &ScenarioSpec) -> Result<()> {
        let path = self.answer_path(spec);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

pub fn result_line(value: &Value) -> Result<String> {
    Ok(format!(
        "RESULT:{}:{}",
        value.kind_name(),
        serde_json::to_string(&value.text())?
    ))
}

/// A JavaScript engine to run generated probes on: `$TIERPROBE_NODE`, else `node` or `nodejs`
/// from `PATH`.
pub fn node_binary() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("TIERPROBE_NODE") {
        return Some(PathBuf::from(path));
    }
    ["node", "nodejs"].into_iter().find_map(which)
}

fn which(name: &str) -> Option<PathBuf> {
    let path_env = std::env::var_os("PATH")?;
    std::env::split_paths(&path_env)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
