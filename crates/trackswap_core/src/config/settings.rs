//! The settings tree persisted in the config file.
//!
//! One struct per TOML table. Every field has a serde default, so a file
//! that names only a few keys still loads.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::{AudioCodec, ExportSettings, OutputContainer, DEFAULT_AUDIO_BITRATE_KBPS};

/// Everything the config file holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// `[paths]`
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations and time limits.
    #[serde(default)]
    pub tools: ToolSettings,

    /// `[analysis]`
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Export defaults.
    #[serde(default)]
    pub export: ExportDefaults,

    /// `[logging]`
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where exports, decoded PCM files and logs go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Default folder for exported files.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for decoded PCM files. Empty means the system temp dir.
    #[serde(default)]
    pub temp_root: String,

    /// Directory for the rolling log file.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "trackswap_output".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: String::new(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// External tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg executable (name on PATH or absolute path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// ffprobe executable.
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Time limit for a duration probe.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Time limit for decoding one track to PCM.
    #[serde(default = "default_extract_timeout")]
    pub extract_timeout_secs: u64,

    /// Time limit for one remux.
    #[serde(default = "default_export_timeout")]
    pub export_timeout_secs: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_extract_timeout() -> u64 {
    600
}

fn default_export_timeout() -> u64 {
    3600
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            probe_timeout_secs: default_probe_timeout(),
            extract_timeout_secs: default_extract_timeout(),
            export_timeout_secs: default_export_timeout(),
        }
    }
}

/// Correlation search and decode rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Longest stretch of audio correlated, in seconds.
    #[serde(default = "default_max_window")]
    pub max_window_secs: f64,

    /// Largest offset searched in either direction, in seconds.
    #[serde(default = "default_max_lag")]
    pub max_lag_secs: f64,

    /// Minimum overlap (fraction of the window) for a lag to be scored.
    #[serde(default = "default_min_overlap")]
    pub min_overlap_ratio: f64,

    /// Confidence at or above which a result is `High`.
    #[serde(default = "default_high_threshold")]
    pub high_confidence_threshold: f64,

    /// Confidence at or above which a result is `Medium`.
    #[serde(default = "default_medium_threshold")]
    pub medium_confidence_threshold: f64,

    /// Rate ffmpeg decodes to before peak downsampling.
    #[serde(default = "default_decode_rate")]
    pub decode_sample_rate: u32,

    /// Rate the analyzer works at.
    #[serde(default = "default_analysis_rate")]
    pub analysis_sample_rate: u32,
}

fn default_max_window() -> f64 {
    30.0
}

fn default_max_lag() -> f64 {
    5.0
}

fn default_min_overlap() -> f64 {
    0.5
}

fn default_high_threshold() -> f64 {
    0.8
}

fn default_medium_threshold() -> f64 {
    0.5
}

fn default_decode_rate() -> u32 {
    8000
}

fn default_analysis_rate() -> u32 {
    1000
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_window_secs: default_max_window(),
            max_lag_secs: default_max_lag(),
            min_overlap_ratio: default_min_overlap(),
            high_confidence_threshold: default_high_threshold(),
            medium_confidence_threshold: default_medium_threshold(),
            decode_sample_rate: default_decode_rate(),
            analysis_sample_rate: default_analysis_rate(),
        }
    }
}

/// Default export options, used to seed [`ExportSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDefaults {
    #[serde(default)]
    pub audio_codec: AudioCodec,

    #[serde(default)]
    pub output_container: OutputContainer,

    #[serde(default = "default_true")]
    pub auto_fade: bool,

    /// Bitrate for lossy codecs; 0 lets ffmpeg choose.
    #[serde(default = "default_bitrate")]
    pub audio_bitrate_kbps: u32,

    #[serde(default)]
    pub overwrite: bool,
}

fn default_true() -> bool {
    true
}

fn default_bitrate() -> u32 {
    DEFAULT_AUDIO_BITRATE_KBPS
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            audio_codec: AudioCodec::default(),
            output_container: OutputContainer::default(),
            auto_fade: true,
            audio_bitrate_kbps: default_bitrate(),
            overwrite: false,
        }
    }
}

impl ExportDefaults {
    /// Export settings seeded from these defaults with a zero offset.
    pub fn to_export_settings(&self) -> ExportSettings {
        ExportSettings {
            offset_secs: 0.0,
            audio_codec: self.audio_codec,
            output_container: self.output_container,
            auto_fade: self.auto_fade,
            audio_bitrate_kbps: (self.audio_bitrate_kbps > 0).then_some(self.audio_bitrate_kbps),
            overwrite: self.overwrite,
        }
    }
}

/// Log level and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set.
    #[serde(default)]
    pub level: LogLevel,

    /// Also write a daily log file into `paths.logs_folder`.
    #[serde(default)]
    pub log_to_file: bool,

    /// Log the remux command one option per line.
    #[serde(default = "default_true")]
    pub show_command_pretty: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            log_to_file: false,
            show_command_pretty: true,
        }
    }
}

/// The tables of the config file, for single-section writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Tools,
    Analysis,
    Export,
    Logging,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Analysis,
        ConfigSection::Export,
        ConfigSection::Logging,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Analysis => "analysis",
            ConfigSection::Export => "export",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section in a generated file.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and working directories",
            ConfigSection::Tools => "External tools and time limits (seconds)",
            ConfigSection::Analysis => "Sync analysis",
            ConfigSection::Export => "Export defaults",
            ConfigSection::Logging => "Logging",
        }
    }
}
