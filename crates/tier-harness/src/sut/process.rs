use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::{Execution, ExitOutcome, Sut};
use crate::error::{HarnessError, Result};
use crate::probe::ProbeScript;
use crate::sentinel::{self, Sentinel};

const STDERR_TAIL_BYTES: usize = 8 * 1024;
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// How to launch the runtime: `<program> <args...> <probe.js>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SutConfig {
    pub label: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl SutConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let label = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sut".to_string());
        Self {
            label,
            program,
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Reads `TIERPROBE_SUT` (program path) and `TIERPROBE_SUT_ARGS` (whitespace-separated).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let program = lookup("TIERPROBE_SUT")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| HarnessError::InvalidConfig("TIERPROBE_SUT is not set".into()))?;
        let args = lookup("TIERPROBE_SUT_ARGS").unwrap_or_default();
        Ok(Self::new(program).with_args(args.split_whitespace()))
    }

    /// Derive a named profile from this base: `name=arg,arg` appends the listed flags.
    ///
    /// `jit=` (empty list) is a profile with the base flags only.
    pub fn profile(&self, spec: &str) -> Result<Self> {
        let (name, args) = spec.split_once('=').ok_or_else(|| {
            HarnessError::InvalidConfig(format!("profile {spec:?} must look like name=arg,arg"))
        })?;
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(HarnessError::InvalidConfig(format!(
                "profile {spec:?} needs a non-empty name without whitespace"
            )));
        }
        let mut profile = self.clone();
        profile.label = name.to_string();
        profile.args.extend(
            args.split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        );
        Ok(profile)
    }
}

/// Runs each probe script in a fresh SUT process.
///
/// Probe scripts are written into a private scratch directory that lives as long as the
/// `ProcessSut`. A process is always killed and reaped before [`Sut::execute`] returns.
pub struct ProcessSut {
    config: SutConfig,
    scratch: TempDir,
    executions: u64,
    resets: u64,
}

impl ProcessSut {
    pub fn new(config: SutConfig) -> Result<Self> {
        let scratch = tempfile::Builder::new().prefix("tierprobe-").tempdir()?;
        Ok(Self {
            config,
            scratch,
            executions: 0,
            resets: 0,
        })
    }

    pub fn config(&self) -> &SutConfig {
        &self.config
    }

    pub fn executions(&self) -> u64 {
        self.executions
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }
}

impl Sut for ProcessSut {
    fn label(&self) -> &str {
        &self.config.label
    }

    async fn execute(&mut self, probe: &ProbeScript, timeout: Duration) -> Result<Execution> {
        let script = self.scratch.path().join(probe.file_name());
        tokio::fs::write(&script, probe.source.as_bytes()).await?;
        self.executions += 1;

        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(
            sut = %self.config.label,
            scenario = %probe.scenario_id,
            script = %script.display(),
            "spawning SUT"
        );
        let mut child = cmd.spawn().map_err(|source| HarnessError::SutUnreachable {
            program: self.config.program.clone(),
            source,
        })?;

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(read_tail(stderr, STDERR_TAIL_BYTES)));
        let stdout = child.stdout.take().ok_or_else(|| {
            HarnessError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "SUT stdout was not captured",
            ))
        })?;

        let deadline = Instant::now() + timeout;
        let mut sentinels = Vec::new();
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        let read = tokio::time::timeout_at(deadline, async {
            loop {
                buf.clear();
                if reader.read_until(b'\n', &mut buf).await? == 0 {
                    break;
                }
                // Runtimes may print non-UTF-8 chatter; sentinels themselves are ASCII framed.
                let line = String::from_utf8_lossy(trim_line_end(&buf));
                let parsed = sentinel::parse_line(&line)?;
                if let Sentinel::Chatter(text) = &parsed {
                    trace!(scenario = %probe.scenario_id, %text, "SUT chatter");
                }
                sentinels.push(parsed);
            }
            Ok::<(), HarnessError>(())
        })
        .await;

        let outcome = match read {
            Ok(Ok(())) => match tokio::time::timeout_at(deadline, child.wait()).await {
                Ok(status) => exit_outcome(status?),
                Err(_) => {
                    kill(&mut child).await;
                    ExitOutcome::TimedOut
                }
            },
            Ok(Err(err)) => {
                kill(&mut child).await;
                return Err(err);
            }
            Err(_) => {
                kill(&mut child).await;
                ExitOutcome::TimedOut
            }
        };

        let stderr_tail = match stderr_task {
            Some(task) => match tokio::time::timeout(STDERR_GRACE, task).await {
                Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
                _ => String::new(),
            },
            None => String::new(),
        };

        debug!(
            sut = %self.config.label,
            scenario = %probe.scenario_id,
            sentinels = sentinels.len(),
            %outcome,
            "SUT finished"
        );
        Ok(Execution {
            sentinels,
            outcome,
            stderr_tail,
        })
    }

    async fn reset(&mut self) -> Result<()> {
        // The next execution spawns a new process; only stale probe files remain to clear.
        self.resets += 1;
        let mut entries = tokio::fs::read_dir(self.scratch.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Err(err) = tokio::fs::remove_file(entry.path()).await {
                warn!(path = %entry.path().display(), %err, "failed to remove stale probe script");
            }
        }
        info!(sut = %self.config.label, resets = self.resets, "SUT reset");
        Ok(())
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

async fn kill(child: &mut Child) {
    if let Err(err) = child.kill().await {
        warn!(%err, "failed to kill SUT process");
    }
}

fn exit_outcome(status: ExitStatus) -> ExitOutcome {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal = None;
    ExitOutcome::Exited {
        code: status.code(),
        signal,
    }
}

async fn read_tail<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> Vec<u8> {
    let mut tail = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        tail.extend_from_slice(&chunk[..n]);
        if tail.len() > limit {
            let excess = tail.len() - limit;
            tail.drain(..excess);
        }
    }
    tail
}
