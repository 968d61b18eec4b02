//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use trackswap_core::models::{AudioCodec, OutputContainer};

#[derive(Parser, Debug)]
#[command(name = "trackswap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "TRACKSWAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect the offset between a video's audio and a replacement track
    Analyze(AnalyzeArgs),
    /// Print the ffmpeg command an export would run
    Plan(PlanArgs),
    /// Replace the audio track of a video
    Export(ExportArgs),
    /// Show or initialize the config file
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Video (or any media) whose audio is the timing reference
    pub reference: PathBuf,

    /// Replacement audio to align
    pub target: PathBuf,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Override the largest offset searched, in seconds
    #[arg(long)]
    pub max_lag: Option<f64>,

    /// Override the analysis window, in seconds
    #[arg(long)]
    pub window: Option<f64>,
}

/// Output format and fade options shared by `plan` and `export`.
#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Output container (mp4, mov, mkv); default from config
    #[arg(long)]
    pub container: Option<OutputContainer>,

    /// Audio codec (aac, alac, flac, mp3, opus, ac3, pcm); default from config
    #[arg(long)]
    pub codec: Option<AudioCodec>,

    /// Bitrate for lossy codecs, in kbit/s
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// Disable the short fade-in/fade-out
    #[arg(long)]
    pub no_fade: bool,

    /// Replace an existing output file
    #[arg(short = 'y', long)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    pub video: PathBuf,
    pub audio: PathBuf,

    /// Output file (default: <paths.output_folder>/<video name>.<container>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Offset of the replacement audio in seconds (positive = later)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub offset: f64,

    /// Video duration in seconds; probed with ffprobe when omitted
    #[arg(long)]
    pub duration: Option<f64>,

    #[command(flatten)]
    pub format: FormatArgs,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    pub video: PathBuf,
    pub audio: PathBuf,

    /// Output file (default: <paths.output_folder>/<video name>.<container>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Offset of the replacement audio in seconds (positive = later)
    #[arg(long, allow_hyphen_values = true, conflicts_with = "auto")]
    pub offset: Option<f64>,

    /// Detect the offset before exporting
    #[arg(long)]
    pub auto: bool,

    /// Apply a detected offset even when confidence is low
    #[arg(long, requires = "auto")]
    pub force: bool,

    #[command(flatten)]
    pub format: FormatArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write a default config file if none exists and create its folders
    #[arg(long)]
    pub init: bool,
}
