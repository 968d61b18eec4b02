//! TrackSwap - swap the audio track of a video without touching the video.
//!
//! ## Usage
//!
//! ```bash
//! trackswap analyze movie.mp4 dub.wav            # Detect the offset
//! trackswap plan movie.mp4 dub.wav -o out.mp4    # Show the ffmpeg command
//! trackswap export movie.mp4 dub.wav --offset 0.25 # Output lands in paths.output_folder
//! trackswap export movie.mp4 dub.wav -o out.mp4 --auto
//! trackswap config --init                        # Write the default config
//! ```
//!
//! Ctrl-C cancels the running command and kills every ffmpeg/ffprobe child.

mod cli;
mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use directories::ProjectDirs;
use tokio_util::sync::CancellationToken;

use trackswap_core::config::ConfigManager;
use trackswap_core::logging::{init_tracing, init_tracing_with_file, LogLevel, WorkerGuard};
use trackswap_core::process::ProcessRegistry;

use cli::{Cli, Commands};

/// Exit status for a run stopped by Ctrl-C (128 + SIGINT).
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match run(cli, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) if cancel.is_cancelled() => {
            eprintln!("Cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = ConfigManager::new(&config_path);
    let config_error = if config_path.exists() {
        config.load().err()
    } else {
        None
    };

    let _log_guard = init_logging(&config, cli.verbose);
    if let Some(e) = config_error {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
    }

    tracing::debug!("Config: {}", config_path.display());
    tracing::debug!("Core version: {}", trackswap_core::version());

    let settings = config.settings().clone();
    match &cli.command {
        Commands::Analyze(args) => commands::analyze(&settings, args, cancel).await,
        Commands::Plan(args) => commands::plan(&settings, args, cancel).await,
        Commands::Export(args) => commands::export(&settings, args, cancel).await,
        Commands::Config(args) => commands::config(&mut config, args),
    }
}

/// Platform config dir, or `.config/trackswap.toml` when none is available.
fn default_config_path() -> PathBuf {
    ProjectDirs::from("io.github", "trackswap", "trackswap")
        .map(|dirs| dirs.config_dir().join("trackswap.toml"))
        .unwrap_or_else(|| PathBuf::from(".config").join("trackswap.toml"))
}

fn init_logging(config: &ConfigManager, verbose: u8) -> Option<WorkerGuard> {
    let logging = &config.settings().logging;
    let level = match verbose {
        0 => logging.level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let result = if logging.log_to_file {
        init_tracing_with_file(level, config.logs_folder()).map(Some)
    } else {
        init_tracing(level).map(|_| None)
    };

    result.unwrap_or_else(|e| {
        eprintln!("Warning: Failed to initialize logging: {}", e);
        None
    })
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted; stopping");
            cancel.cancel();
            let killed = ProcessRegistry::global().terminate_all();
            if killed > 0 {
                tracing::debug!("Terminated {} running process(es)", killed);
            }
        }
    });
}
