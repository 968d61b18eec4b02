//! Request and error types for remux command synthesis.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{AudioCodec, ExportSettings, OutputContainer};

/// Everything needed to synthesize one remux invocation.
#[derive(Debug, Clone)]
pub struct RemuxRequest {
    /// Source of the video stream (copied untouched).
    pub video_path: PathBuf,
    /// Source of the replacement audio stream.
    pub audio_path: PathBuf,
    /// Output file.
    pub output_path: PathBuf,
    /// Offset, format and fade policy.
    pub settings: ExportSettings,
    /// Duration of the video stream, when known.
    pub video_duration_secs: Option<f64>,
}

impl RemuxRequest {
    pub fn new(
        video_path: impl Into<PathBuf>,
        audio_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            video_path: video_path.into(),
            audio_path: audio_path.into(),
            output_path: output_path.into(),
            settings,
            video_duration_secs: None,
        }
    }

    /// Attach the probed video duration.
    pub fn with_video_duration(mut self, duration_secs: Option<f64>) -> Self {
        self.video_duration_secs = duration_secs;
        self
    }

    /// The video duration if it is usable (finite and positive).
    pub fn known_duration(&self) -> Option<f64> {
        self.video_duration_secs
            .filter(|d| d.is_finite() && *d > 0.0)
    }
}

/// Errors raised while synthesizing a remux command.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MuxError {
    /// The container cannot carry the codec.
    #[error("Container '{container}' does not support audio codec '{codec}'")]
    IncompatibleFormat {
        container: OutputContainer,
        codec: AudioCodec,
    },

    /// A negative offset needs the video duration to keep the video intact.
    #[error("Video duration is unknown; cannot trim audio without truncating the video")]
    DurationUnknown,

    /// The offset is NaN or infinite.
    #[error("Invalid offset: {0}")]
    InvalidOffset(f64),

    /// ffmpeg arguments are passed as UTF-8 text.
    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

/// Result type for mux operations.
pub type MuxResult<T> = Result<T, MuxError>;
