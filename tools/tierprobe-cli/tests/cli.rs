#![cfg(all(unix, not(target_arch = "wasm32")))]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

/// Answers every `// checkpoint:` header of the probe (always the last argument) according to
/// `FAKE_MODE`: `ok` (28), `corrupt` (function source), `hang`, `garbage`.
const FAKE_RUNTIME: &str = r#"#!/bin/sh
for probe; do :; done
mode="${FAKE_MODE:-ok}"
if [ "$mode" = garbage ]; then
  echo "RESULT:number:28"
  exit 0
fi
if [ "$mode" = hang ]; then
  exec sleep 30
fi
echo "runtime banner"
grep '^// checkpoint: ' "$probe" | sed 's#^// checkpoint: ##' | while read -r cp; do
  echo "CHECKPOINT:$cp"
  if [ "$mode" = corrupt ]; then
    echo 'RESULT:string:"function sum7(p1, p2, p3, p4, p5, p6, p7) { return p1 + p2; }"'
  else
    echo 'RESULT:number:"28"'
  fi
done
echo DONE
"#;

fn fake_runtime(dir: &Path) -> PathBuf {
    let path = dir.join("fake-runtime.sh");
    std::fs::write(&path, FAKE_RUNTIME).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn tierprobe(sut: &Path, mode: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tierprobe"));
    for key in [
        "TIERPROBE_SUT",
        "TIERPROBE_SUT_ARGS",
        "TIERPROBE_SCHEDULE",
        "TIERPROBE_FILTER",
        "TIERPROBE_ADVISORY",
        "TIERPROBE_TIMEOUT_SECS",
    ] {
        cmd.env_remove(key);
    }
    cmd.env("FAKE_MODE", mode)
        .arg("--sut")
        .arg(sut)
        .args(["--filter", "id:arity/sum7"]);
    cmd
}

#[test]
fn correct_runtime_passes() {
    let dir = tempfile::tempdir().unwrap();
    let sut = fake_runtime(dir.path());
    tierprobe(&sut, "ok")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("total scenarios: 1"))
        .stdout(predicate::str::contains("passed: 1"))
        .stdout(predicate::str::contains("failed: 0"));
}

#[test]
fn function_source_result_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let sut = fake_runtime(dir.path());
    tierprobe(&sut, "corrupt")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Corrupted: 1"))
        .stdout(predicate::str::contains(
            "arity/sum7 @ interpreted: Corrupted expected=28 actual=function sum7(",
        ));
}

#[test]
fn hanging_runtime_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let sut = fake_runtime(dir.path());
    tierprobe(&sut, "hang")
        .args(["--timeout-secs", "0.5"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("arity/sum7 @ interpreted: Timeout"));
}

#[test]
fn malformed_sentinel_is_a_harness_error() {
    let dir = tempfile::tempdir().unwrap();
    let sut = fake_runtime(dir.path());
    tierprobe(&sut, "garbage")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("malformed sentinel"));
}

#[test]
fn missing_runtime_is_a_harness_error() {
    let dir = tempfile::tempdir().unwrap();
    tierprobe(&dir.path().join("no-such-runtime"), "ok")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SUT unreachable"));
}

#[test]
fn profiles_run_as_separate_suites() {
    let dir = tempfile::tempdir().unwrap();
    let sut = fake_runtime(dir.path());
    tierprobe(&sut, "ok")
        .args(["--profile", "interp=-NoNative", "--profile", "jit="])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("suite: interp"))
        .stdout(predicate::str::contains("suite: jit"));
}

#[test]
fn json_report_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let sut = fake_runtime(dir.path());
    let report = dir.path().join("out/report.json");
    tierprobe(&sut, "corrupt")
        .arg("--report-json")
        .arg(&report)
        .assert()
        .code(1);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    let suite = &json["suites"][0];
    assert_eq!(suite["failed"], 1);
    assert_eq!(suite["scenarios"][0]["id"], "arity/sum7");
    assert_eq!(suite["scenarios"][0]["overall"], "Corrupted");
}

#[test]
fn list_needs_no_runtime() {
    Command::new(env!("CARGO_BIN_EXE_tierprobe"))
        .env_remove("TIERPROBE_SUT")
        .env_remove("TIERPROBE_FILTER")
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("arity/sum7"))
        .stdout(predicate::str::contains("exceptions/every-third-throw"));
}

#[test]
fn invalid_schedule_is_rejected() {
    Command::new(env!("CARGO_BIN_EXE_tierprobe"))
        .args(["--list", "--schedule", "warm=100,cold=10"])
        .assert()
        .code(2);
}
