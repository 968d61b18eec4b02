//! Core types for sync analysis.

use serde::{Deserialize, Serialize};

/// Thresholds that classify a confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    /// Minimum confidence for [`ConfidenceLevel::High`].
    pub high: f64,
    /// Minimum confidence for [`ConfidenceLevel::Medium`].
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.5,
        }
    }
}

/// Reliability class of a detected offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Classify a confidence value.
    pub fn classify(confidence: f64, thresholds: &ConfidenceThresholds) -> Self {
        if confidence >= thresholds.high {
            ConfidenceLevel::High
        } else if confidence >= thresholds.medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::Low => write!(f, "low"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::High => write!(f, "high"),
        }
    }
}

/// Time window used for correlation, always starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedRange {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl AnalyzedRange {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Result of one sync analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncAnalysisResult {
    /// Offset to apply to the target (positive = target starts later).
    pub detected_offset_secs: f64,
    /// Refined lag in analysis samples.
    pub lag_samples: f64,
    /// Peak normalized correlation, clamped into `[0, 1]`.
    pub confidence: f64,
    /// Classified confidence.
    pub confidence_level: ConfidenceLevel,
    /// Window the correlation was computed over.
    pub analyzed_range: AnalyzedRange,
    /// Sample rate shared by both waveforms.
    pub sample_rate: u32,
    /// Whether parabolic peak refinement was applied.
    pub peak_fitted: bool,
}

impl SyncAnalysisResult {
    /// Offset in milliseconds, for display.
    pub fn detected_offset_ms(&self) -> f64 {
        self.detected_offset_secs * 1000.0
    }

    /// Whether the operator should confirm the offset before it is applied.
    pub fn needs_confirmation(&self) -> bool {
        self.confidence_level == ConfidenceLevel::Low
    }
}

/// Error types for analysis operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// One of the inputs is empty or the clamped window has no samples.
    #[error("Insufficient audio data for analysis: {0}")]
    InsufficientData(String),

    /// The two waveforms were sampled at different analysis rates.
    #[error("Sample rate mismatch: reference {reference} Hz, target {target} Hz")]
    SampleRateMismatch { reference: u32, target: u32 },

    /// The background analysis task did not complete.
    #[error("Analysis task failed: {0}")]
    TaskFailed(String),
}

impl AnalysisError {
    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData(message.into())
    }
}

/// Type alias for analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
