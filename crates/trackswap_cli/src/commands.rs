//! Subcommand implementations.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;

use trackswap_core::analysis::{AnalyzerConfig, SyncAnalysisResult, SyncAnalyzer};
use trackswap_core::config::{ConfigManager, Settings};
use trackswap_core::export::Exporter;
use trackswap_core::extraction::WaveformExtractor;
use trackswap_core::models::{ExportSettings, OutputContainer};
use trackswap_core::mux::{format_tokens_pretty, RemuxCommandBuilder, RemuxRequest};
use trackswap_core::process::ProcessRunner;
use trackswap_core::session::{SessionError, SyncSession, TrackRole};

use crate::cli::{AnalyzeArgs, ConfigArgs, ExportArgs, FormatArgs, PlanArgs};

pub async fn analyze(
    settings: &Settings,
    args: &AnalyzeArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut config = AnalyzerConfig::from(&settings.analysis);
    if let Some(max_lag) = args.max_lag {
        config.max_lag_secs = max_lag;
    }
    if let Some(window) = args.window {
        config.max_window_secs = window;
    }

    let mut session = new_session(settings, config);
    let result = run_analysis(&mut session, &args.reference, &args.target, cancel).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

pub async fn plan(settings: &Settings, args: &PlanArgs, cancel: &CancellationToken) -> Result<()> {
    let export_settings = export_settings(settings, &args.format).with_offset(args.offset);
    let output = output_path(
        settings,
        &args.video,
        export_settings.output_container,
        args.output.as_deref(),
    );
    let request = RemuxRequest::new(&args.video, &args.audio, output, export_settings)
        .with_video_duration(args.duration);

    // A given duration makes the plan pure; otherwise probe like an export would
    let tokens = if args.duration.is_some() {
        RemuxCommandBuilder::new(&request).build()?
    } else {
        let exporter = Exporter::new(ProcessRunner::default(), &settings.tools);
        exporter.plan(&request, cancel).await?.1
    };

    print!("{}", format_tokens_pretty(&settings.tools.ffmpeg_path, &tokens));
    Ok(())
}

pub async fn export(
    settings: &Settings,
    args: &ExportArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    let offset = if args.auto {
        let mut session = new_session(settings, AnalyzerConfig::from(&settings.analysis));
        let result = run_analysis(&mut session, &args.video, &args.audio, cancel).await?;
        print_result(&result);

        match session.accept_suggestion(args.force) {
            Ok(offset) => offset,
            Err(e @ SessionError::LowConfidence { .. }) => {
                bail!("{} (pass --force, or give --offset explicitly)", e)
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        args.offset.unwrap_or(0.0)
    };

    let export_settings = export_settings(settings, &args.format).with_offset(offset);
    let output = output_path(
        settings,
        &args.video,
        export_settings.output_container,
        args.output.as_deref(),
    );
    let request = RemuxRequest::new(&args.video, &args.audio, output, export_settings);

    let exporter = Exporter::new(ProcessRunner::default(), &settings.tools)
        .with_pretty_log(settings.logging.show_command_pretty);
    let report = exporter.export(&request, cancel).await?;

    println!(
        "Wrote {} (offset {:+.3}s) in {:.1}s",
        report.output_path.display(),
        offset,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

pub fn config(manager: &mut ConfigManager, args: &ConfigArgs) -> Result<()> {
    if args.init {
        manager
            .load_or_create()
            .with_context(|| format!("Failed to initialize {}", manager.path().display()))?;
        manager
            .ensure_dirs_exist()
            .context("Failed to create configured folders")?;
        println!("Config: {}", manager.path().display());
        return Ok(());
    }

    println!("# {}", manager.path().display());
    print!("{}", toml::to_string_pretty(manager.settings())?);
    Ok(())
}

fn new_session(settings: &Settings, config: AnalyzerConfig) -> SyncSession {
    SyncSession::new(
        WaveformExtractor::from_settings(ProcessRunner::default(), settings),
        SyncAnalyzer::new(config),
    )
}

async fn run_analysis(
    session: &mut SyncSession,
    reference: &Path,
    target: &Path,
    cancel: &CancellationToken,
) -> Result<SyncAnalysisResult> {
    session
        .load_track(TrackRole::Reference, reference, cancel)
        .await?;
    session.load_track(TrackRole::Target, target, cancel).await?;
    Ok(session.analyze().await?)
}

/// `explicit`, or `<output_folder>/<video stem>.<container extension>`.
fn output_path(
    settings: &Settings,
    video: &Path,
    container: OutputContainer,
    explicit: Option<&Path>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    PathBuf::from(&settings.paths.output_folder)
        .join(format!("{}.{}", stem, container.extension()))
}

fn export_settings(settings: &Settings, format: &FormatArgs) -> ExportSettings {
    let mut export = settings.export.to_export_settings();
    if let Some(container) = format.container {
        export.output_container = container;
    }
    if let Some(codec) = format.codec {
        export.audio_codec = codec;
    }
    if let Some(kbps) = format.bitrate {
        export.audio_bitrate_kbps = (kbps > 0).then_some(kbps);
    }
    if format.no_fade {
        export.auto_fade = false;
    }
    if format.overwrite {
        export.overwrite = true;
    }
    export
}

fn print_result(result: &SyncAnalysisResult) {
    println!(
        "Offset: {:+.3} s ({:+.1} ms)",
        result.detected_offset_secs,
        result.detected_offset_ms()
    );
    println!(
        "Confidence: {:.3} ({})",
        result.confidence, result.confidence_level
    );
    println!(
        "Analyzed: {:.1} s ({:.1}-{:.1} s) at {} Hz",
        result.analyzed_range.duration_secs(),
        result.analyzed_range.start_secs,
        result.analyzed_range.end_secs,
        result.sample_rate
    );
    if result.needs_confirmation() {
        println!("Low confidence: verify before applying this offset.");
    }
}
