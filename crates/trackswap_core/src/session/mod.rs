//! One alignment session: a reference track, a target track, and the offset
//! the operator settles on.
//!
//! The session owns the decoded tracks (and with them their temporary PCM
//! files). Replacing a track or resetting the session drops the old track,
//! which deletes its PCM file and invalidates any earlier analysis.
//!
//! The detected offset is only ever a suggestion: the working offset changes
//! when the operator accepts the suggestion or sets one manually, and a
//! `Low` confidence suggestion is refused unless explicitly forced.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::analysis::{AnalysisError, ConfidenceLevel, SyncAnalysisResult, SyncAnalyzer};
use crate::extraction::{DecodedTrack, ExtractionError, WaveformExtractor};
use crate::models::{ExportSettings, Waveform};

/// Which side of the comparison a track is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRole {
    /// The video's own audio; defines the timeline.
    Reference,
    /// The replacement audio being aligned.
    Target,
}

impl fmt::Display for TrackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackRole::Reference => write!(f, "reference"),
            TrackRole::Target => write!(f, "target"),
        }
    }
}

/// Errors from session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No {0} track loaded")]
    MissingTrack(TrackRole),

    #[error("No analysis has been run since the tracks last changed")]
    NoAnalysis,

    #[error("Detected offset has low confidence ({confidence:.3}); confirm to apply it anyway")]
    LowConfidence { confidence: f64 },

    #[error("Offset must be a finite number of seconds, got {0}")]
    InvalidOffset(f64),

    #[error("Failed to load {role} track: {source}")]
    Extraction {
        role: TrackRole,
        #[source]
        source: ExtractionError,
    },

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
}

impl SessionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Extraction { source, .. } if source.is_cancelled())
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// State of one reference/target alignment.
pub struct SyncSession {
    extractor: WaveformExtractor,
    analyzer: SyncAnalyzer,
    reference: Option<DecodedTrack>,
    target: Option<DecodedTrack>,
    last_result: Option<SyncAnalysisResult>,
    offset_secs: f64,
}

impl SyncSession {
    pub fn new(extractor: WaveformExtractor, analyzer: SyncAnalyzer) -> Self {
        Self {
            extractor,
            analyzer,
            reference: None,
            target: None,
            last_result: None,
            offset_secs: 0.0,
        }
    }

    /// Decode `media` and install it as the `role` track.
    pub async fn load_track(
        &mut self,
        role: TrackRole,
        media: &Path,
        cancel: &CancellationToken,
    ) -> SessionResult<Arc<Waveform>> {
        let track = self
            .extractor
            .extract(media, cancel)
            .await
            .map_err(|source| SessionError::Extraction { role, source })?;
        let waveform = track.waveform();
        self.set_track(role, track);
        Ok(waveform)
    }

    /// Install an already decoded track, replacing (and dropping) the old one.
    pub fn set_track(&mut self, role: TrackRole, track: DecodedTrack) {
        tracing::debug!("Session {} track: {}", role, track.source().display());
        *self.slot(role) = Some(track);
        self.last_result = None;
    }

    pub fn track(&self, role: TrackRole) -> Option<&DecodedTrack> {
        match role {
            TrackRole::Reference => self.reference.as_ref(),
            TrackRole::Target => self.target.as_ref(),
        }
    }

    /// Drop the `role` track (deleting its PCM file).
    pub fn clear_track(&mut self, role: TrackRole) {
        if self.slot(role).take().is_some() {
            self.last_result = None;
        }
    }

    /// Correlate the loaded tracks off the async executor.
    pub async fn analyze(&mut self) -> SessionResult<SyncAnalysisResult> {
        let reference = self
            .reference
            .as_ref()
            .ok_or(SessionError::MissingTrack(TrackRole::Reference))?
            .waveform();
        let target = self
            .target
            .as_ref()
            .ok_or(SessionError::MissingTrack(TrackRole::Target))?
            .waveform();

        let result = self.analyzer.analyze_detached(reference, target).await?;
        self.last_result = Some(result.clone());
        Ok(result)
    }

    pub fn last_result(&self) -> Option<&SyncAnalysisResult> {
        self.last_result.as_ref()
    }

    /// Working offset for export.
    pub fn offset_secs(&self) -> f64 {
        self.offset_secs
    }

    /// Operator-entered offset; overrides any suggestion.
    pub fn set_offset(&mut self, offset_secs: f64) -> SessionResult<()> {
        if !offset_secs.is_finite() {
            return Err(SessionError::InvalidOffset(offset_secs));
        }
        self.offset_secs = offset_secs;
        Ok(())
    }

    /// Adopt the detected offset as the working offset.
    ///
    /// `Low` confidence results are refused unless `force` is set.
    pub fn accept_suggestion(&mut self, force: bool) -> SessionResult<f64> {
        let result = self.last_result.as_ref().ok_or(SessionError::NoAnalysis)?;

        if result.confidence_level == ConfidenceLevel::Low && !force {
            return Err(SessionError::LowConfidence {
                confidence: result.confidence,
            });
        }

        self.offset_secs = result.detected_offset_secs;
        tracing::info!(
            "Accepted offset {:+.3}s ({} confidence)",
            self.offset_secs,
            result.confidence_level
        );
        Ok(self.offset_secs)
    }

    /// `base` with the working offset applied.
    pub fn export_settings(&self, base: &ExportSettings) -> ExportSettings {
        base.clone().with_offset(self.offset_secs)
    }

    /// Drop both tracks and forget analysis and offset.
    pub fn reset(&mut self) {
        self.reference = None;
        self.target = None;
        self.last_result = None;
        self.offset_secs = 0.0;
    }

    fn slot(&mut self, role: TrackRole) -> &mut Option<DecodedTrack> {
        match role {
            TrackRole::Reference => &mut self.reference,
            TrackRole::Target => &mut self.target,
        }
    }
}
