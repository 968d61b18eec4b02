//! Audio analysis module for sync detection.
//!
//! Estimates the signed offset between a reference waveform (the video's
//! own audio) and a target waveform (the replacement audio) by windowed,
//! normalized cross-correlation.
//!
//! # Architecture
//!
//! 1. **Correlation** (`correlation`): Pearson correlation per lag, each
//!    overlap mean-centered on its own samples.
//! 2. **Peak Fitting** (`peak_fit`): parabolic refinement of the best lag to
//!    sub-sample precision.
//! 3. **Analyzer** (`analyzer`): window/lag clamping, confidence and the
//!    final [`SyncAnalysisResult`].
//!
//! # Usage
//!
//! ```ignore
//! use trackswap_core::analysis::{AnalyzerConfig, SyncAnalyzer};
//!
//! let analyzer = SyncAnalyzer::new(AnalyzerConfig::default());
//! let result = analyzer.analyze(&reference, &target)?;
//! if result.needs_confirmation() {
//!     // Present as a suggestion only
//! }
//! ```

mod analyzer;
mod correlation;
mod peak_fit;
pub mod types;

pub use analyzer::{AnalyzerConfig, SyncAnalyzer};
pub use correlation::{correlation_curve, overlap_at_lag, pearson};
pub use peak_fit::{find_and_fit_peak, find_peak, fit_peak, PeakFit};
pub use types::{
    AnalysisError, AnalysisResult, AnalyzedRange, ConfidenceLevel, ConfidenceThresholds,
    SyncAnalysisResult,
};
