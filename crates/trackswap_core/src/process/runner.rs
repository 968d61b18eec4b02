//! Async runner for external tools (ffmpeg, ffprobe).
//!
//! Each run races four events and acts on whichever happens first:
//! child exit, the timeout timer, caller cancellation and registry
//! termination. Both output pipes are drained by their own tasks while the
//! child runs, so a tool that writes a lot to stderr can never block on a
//! full pipe while we wait for it to exit.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::errors::{ProcessError, ProcessResult};
use super::registry::ProcessRegistry;

/// Pipe read size.
const CHUNK_SIZE: usize = 8 * 1024;

/// How much trailing stderr is kept as the failure diagnostic.
const DIAGNOSTIC_TAIL_BYTES: usize = 4 * 1024;

/// How long to wait for the drain tasks after the child has exited.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Default time limit for an invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

type DrainHandle = JoinHandle<std::io::Result<()>>;

/// One execution of an external program.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub timeout: Duration,
}

impl ProcessInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program name used in logs and errors.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Shell-like rendering for logs.
    pub fn display_command(&self) -> String {
        let mut line = self.program_name();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push('"');
                line.push_str(&arg);
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

/// Captured result of a successful run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

/// How a run ended, decided by the first `select!` arm to complete.
enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Runs external programs with timeout, cancellation and output capture.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    registry: ProcessRegistry,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(ProcessRegistry::global().clone())
    }
}

impl ProcessRunner {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Run `invocation` to completion, timeout or cancellation.
    ///
    /// The child is killed and reaped before `Timeout` or `Cancelled` is
    /// returned. Dropping the returned future kills the child as well.
    pub async fn run(
        &self,
        invocation: &ProcessInvocation,
        cancel: &CancellationToken,
    ) -> ProcessResult<ProcessOutput> {
        let program = invocation.program_name();

        if cancel.is_cancelled() {
            return Err(ProcessError::cancelled(program));
        }

        tracing::debug!("$ {}", invocation.display_command());

        let started = Instant::now();
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProcessError::launch_failed(&program, e))?;

        let registration = self.registry.register(&program, child.id());
        let kill = registration.kill_token().clone();

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(spawn_drain(stdout, Arc::clone(&stdout_buf)));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(spawn_drain(stderr, Arc::clone(&stderr_buf)));
        }

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = tokio::time::sleep(invocation.timeout) => Outcome::TimedOut,
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = kill.cancelled() => Outcome::Cancelled,
        };

        let status = match outcome {
            Outcome::Exited(status) => status,
            Outcome::TimedOut => {
                tracing::warn!("'{}' timed out after {:?}", program, invocation.timeout);
                kill_and_reap(&mut child, drains, &program).await;
                return Err(ProcessError::timeout(program, invocation.timeout));
            }
            Outcome::Cancelled => {
                tracing::info!("'{}' cancelled", program);
                kill_and_reap(&mut child, drains, &program).await;
                return Err(ProcessError::cancelled(program));
            }
        };

        for drain in drains {
            join_drain(drain, &program).await;
        }
        drop(registration);

        let status = status.map_err(|e| ProcessError::io(&program, e))?;
        let stdout = String::from_utf8_lossy(&take(&stdout_buf)).into_owned();
        let stderr_bytes = take(&stderr_buf);
        let elapsed = started.elapsed();

        if !status.success() {
            let diagnostic = diagnostic_tail(&stderr_bytes);
            tracing::debug!(
                "'{}' exited with {:?} after {:?}",
                program,
                status.code(),
                elapsed
            );
            return Err(ProcessError::execution_failed(
                program,
                status.code(),
                diagnostic,
            ));
        }

        tracing::debug!("'{}' finished in {:?}", program, elapsed);

        Ok(ProcessOutput {
            stdout,
            stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
            exit_code: status.code(),
            elapsed,
        })
    }
}

async fn kill_and_reap(child: &mut Child, drains: Vec<DrainHandle>, program: &str) {
    // kill() also waits, so the child is reaped here
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill '{}': {}", program, e);
    }
    // Grandchildren may still hold the pipes open
    for drain in drains {
        drain.abort();
    }
}

fn spawn_drain<R>(reader: R, sink: Arc<Mutex<Vec<u8>>>) -> DrainHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(drain(reader, sink))
}

/// Copy a pipe into `sink` chunk by chunk until EOF.
async fn drain<R>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        sink.lock().extend_from_slice(&chunk[..n]);
    }
}

async fn join_drain(mut drain: DrainHandle, program: &str) {
    match tokio::time::timeout(DRAIN_GRACE, &mut drain).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::warn!("Reading output of '{}' failed: {}", program, e),
        Ok(Err(e)) => tracing::warn!("Output reader for '{}' panicked: {}", program, e),
        Err(_) => {
            tracing::warn!(
                "Output of '{}' still open {:?} after exit; keeping what was read",
                program,
                DRAIN_GRACE
            );
            drain.abort();
        }
    }
}

fn take(buf: &Mutex<Vec<u8>>) -> Vec<u8> {
    std::mem::take(&mut *buf.lock())
}

/// Last [`DIAGNOSTIC_TAIL_BYTES`] of stderr, trimmed.
fn diagnostic_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(DIAGNOSTIC_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}
