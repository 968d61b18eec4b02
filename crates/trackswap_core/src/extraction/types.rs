//! Types for extraction operations.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;
use thiserror::Error;

use crate::models::{Waveform, WaveformError};
use crate::process::ProcessError;

/// Error type for probing and decoding media files.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Input file does not exist.
    #[error("File not found: {0}")]
    SourceNotFound(PathBuf),

    /// The external tool failed, timed out or was cancelled.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The file has no decodable audio stream.
    #[error("No audio stream in {0}")]
    NoAudio(PathBuf),

    /// Tool output could not be understood.
    #[error("Failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Waveform(#[from] WaveformError),
}

impl ExtractionError {
    pub fn parse_error(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether the underlying process run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Process(e) if e.is_cancelled())
    }
}

/// Result type for extraction operations.
pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// A media file decoded to an analysis waveform.
///
/// Owns the temporary PCM file ffmpeg wrote; it is deleted when the track
/// is dropped.
#[derive(Debug)]
pub struct DecodedTrack {
    source: PathBuf,
    waveform: Arc<Waveform>,
    pcm: TempPath,
}

impl DecodedTrack {
    pub(crate) fn new(source: PathBuf, waveform: Waveform, pcm: TempPath) -> Self {
        Self {
            source,
            waveform: Arc::new(waveform),
            pcm,
        }
    }

    /// The media file this track was decoded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Shared handle to the analysis waveform.
    pub fn waveform(&self) -> Arc<Waveform> {
        Arc::clone(&self.waveform)
    }

    /// Location of the decoded PCM file (valid while `self` lives).
    pub fn pcm_path(&self) -> &Path {
        &self.pcm
    }
}
