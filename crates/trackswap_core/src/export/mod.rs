//! Export pipeline: validate, probe, build, run, verify.
//!
//! Format problems are reported before any external process is started.
//! The video duration is probed only when the remux needs it (negative
//! offset or fades) and the caller did not supply it.
//!
//! ffmpeg writes to a hidden staging file next to the output. The output
//! path is only touched once the run succeeded and produced data, so a
//! failed, timed-out or cancelled export leaves any previous file intact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempPath;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::ToolSettings;
use crate::extraction::{ExtractionError, MediaProbe};
use crate::mux::{
    check_settings, format_tokens_pretty, needs_duration, MuxError, RemuxCommandBuilder,
    RemuxRequest,
};
use crate::process::{ProcessError, ProcessInvocation, ProcessRunner};

/// Errors from an export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Mux(#[from] MuxError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Output already exists: {0} (enable overwrite to replace it)")]
    OutputExists(PathBuf),

    #[error("ffmpeg reported success but the output is missing or empty: {0}")]
    OutputMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ExportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Process(e) if e.is_cancelled())
    }
}

/// Result type for exports.
pub type ExportResult<T> = Result<T, ExportError>;

/// What a finished export produced.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub output_path: PathBuf,
    /// Planned arguments, naming the final output path.
    pub args: Vec<String>,
    pub video_duration_secs: Option<f64>,
    pub elapsed: Duration,
}

/// Runs remux exports through ffmpeg.
#[derive(Debug, Clone)]
pub struct Exporter {
    runner: ProcessRunner,
    probe: MediaProbe,
    ffmpeg_path: PathBuf,
    timeout: Duration,
    log_pretty: bool,
}

impl Exporter {
    pub fn new(runner: ProcessRunner, tools: &ToolSettings) -> Self {
        Self {
            probe: MediaProbe::from_settings(runner.clone(), tools),
            runner,
            ffmpeg_path: PathBuf::from(&tools.ffmpeg_path),
            timeout: Duration::from_secs(tools.export_timeout_secs),
            log_pretty: true,
        }
    }

    /// Log the command one option per line instead of on one line.
    pub fn with_pretty_log(mut self, enabled: bool) -> Self {
        self.log_pretty = enabled;
        self
    }

    /// Arguments the export would run, probing the duration if needed.
    pub async fn plan(
        &self,
        request: &RemuxRequest,
        cancel: &CancellationToken,
    ) -> ExportResult<(RemuxRequest, Vec<String>)> {
        check_settings(&request.settings)?;
        for input in [&request.video_path, &request.audio_path] {
            if !input.exists() {
                return Err(ExportError::InputNotFound(input.clone()));
            }
        }

        let mut request = request.clone();
        if request.known_duration().is_none() && needs_duration(&request.settings) {
            request.video_duration_secs = self.probe_duration(&request.video_path, cancel).await?;
        }

        let args = RemuxCommandBuilder::new(&request).build()?;
        Ok((request, args))
    }

    /// Validate, probe, build and run the remux described by `request`.
    pub async fn export(
        &self,
        request: &RemuxRequest,
        cancel: &CancellationToken,
    ) -> ExportResult<ExportReport> {
        let started = Instant::now();
        let (request, args) = self.plan(request, cancel).await?;
        let output = &request.output_path;
        let overwrite = request.settings.overwrite;

        if output.exists() && !overwrite {
            return Err(ExportError::OutputExists(output.clone()));
        }
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Dropping `staging` on any early return deletes the partial file
        let staging = staging_path(output)?;
        let mut staged = request.clone();
        staged.output_path = staging.to_path_buf();
        staged.settings.overwrite = true;
        let staged_args = RemuxCommandBuilder::new(&staged).build()?;

        tracing::info!(
            "Exporting {} with audio from {} (offset {:+.3}s)",
            request.video_path.display(),
            request.audio_path.display(),
            request.settings.offset_secs
        );
        if self.log_pretty {
            tracing::debug!(
                "{}",
                format_tokens_pretty(&self.ffmpeg_path.to_string_lossy(), &staged_args)
            );
        }

        let invocation = ProcessInvocation::new(&self.ffmpeg_path)
            .args(staged_args.iter())
            .with_timeout(self.timeout);
        self.runner.run(&invocation, cancel).await?;

        if !is_non_empty_file(&staging) {
            return Err(ExportError::OutputMissing(output.clone()));
        }
        publish(staging, output, overwrite)?;

        let elapsed = started.elapsed();
        tracing::info!("Wrote {} in {:?}", output.display(), elapsed);

        Ok(ExportReport {
            output_path: output.clone(),
            args,
            video_duration_secs: request.video_duration_secs,
            elapsed,
        })
    }

    /// Probe the video duration. Cancellation propagates; other probe
    /// failures leave the duration unknown.
    async fn probe_duration(
        &self,
        video: &Path,
        cancel: &CancellationToken,
    ) -> ExportResult<Option<f64>> {
        match self.probe.video_duration(video, cancel).await {
            Ok(duration) => Ok(duration),
            Err(ExtractionError::Process(e)) if e.is_cancelled() => Err(e.into()),
            Err(e) => {
                tracing::warn!("Could not probe duration of {}: {}", video.display(), e);
                Ok(None)
            }
        }
    }
}

/// Reserve `.trackswap-XXXXXX.<ext>` beside `output`.
///
/// The extension is kept so ffmpeg picks the same muxer.
fn staging_path(output: &Path) -> io::Result<TempPath> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let suffix = output
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix(".trackswap-").suffix(&suffix);
    // The staging file becomes the output; don't leave it owner-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }
    Ok(builder.tempfile_in(dir)?.into_temp_path())
}

/// Move the finished staging file onto `output`.
fn publish(staging: TempPath, output: &Path, overwrite: bool) -> ExportResult<()> {
    let persisted = if overwrite {
        staging.persist(output)
    } else {
        staging.persist_noclobber(output)
    };
    persisted.map_err(|e| match e.error.kind() {
        io::ErrorKind::AlreadyExists => ExportError::OutputExists(output.to_path_buf()),
        _ => ExportError::Io(e.error),
    })
}

fn is_non_empty_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}
