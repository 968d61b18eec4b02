//! Sync analyzer: estimates the offset that aligns a target to a reference.

use std::sync::Arc;

use crate::config::AnalysisSettings;
use crate::models::Waveform;

use super::correlation::correlation_curve;
use super::peak_fit::{find_and_fit_peak, PeakFit};
use super::types::{
    AnalysisError, AnalysisResult, AnalyzedRange, ConfidenceLevel, ConfidenceThresholds,
    SyncAnalysisResult,
};

/// Overlaps shorter than this never score, whatever the ratio says.
const MIN_OVERLAP_SAMPLES: usize = 16;

/// Configuration for the correlation search.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Longest stretch of audio (from the start) that is correlated.
    pub max_window_secs: f64,
    /// Largest offset searched in either direction.
    pub max_lag_secs: f64,
    /// Lags overlapping less than this fraction of the window score zero.
    ///
    /// Never excludes a lag inside the `max_lag_secs` ceiling.
    pub min_overlap_ratio: f64,
    /// Confidence classification thresholds.
    pub thresholds: ConfidenceThresholds,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_window_secs: 30.0,
            max_lag_secs: 5.0,
            min_overlap_ratio: 0.5,
            thresholds: ConfidenceThresholds::default(),
        }
    }
}

impl From<&AnalysisSettings> for AnalyzerConfig {
    fn from(settings: &AnalysisSettings) -> Self {
        Self {
            max_window_secs: settings.max_window_secs,
            max_lag_secs: settings.max_lag_secs,
            min_overlap_ratio: settings.min_overlap_ratio,
            thresholds: ConfidenceThresholds {
                high: settings.high_confidence_threshold,
                medium: settings.medium_confidence_threshold,
            },
        }
    }
}

/// Windowed normalized cross-correlation analyzer.
#[derive(Debug, Clone, Default)]
pub struct SyncAnalyzer {
    config: AnalyzerConfig,
}

impl SyncAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Estimate the offset that best aligns `target` to `reference`.
    ///
    /// A positive offset means the target has to start later than the
    /// reference; a negative one means its head has to be trimmed.
    pub fn analyze(
        &self,
        reference: &Waveform,
        target: &Waveform,
    ) -> AnalysisResult<SyncAnalysisResult> {
        if reference.is_empty() {
            return Err(AnalysisError::insufficient_data("reference waveform is empty"));
        }
        if target.is_empty() {
            return Err(AnalysisError::insufficient_data("target waveform is empty"));
        }
        if reference.sample_rate() != target.sample_rate() {
            return Err(AnalysisError::SampleRateMismatch {
                reference: reference.sample_rate(),
                target: target.sample_rate(),
            });
        }

        let rate = reference.sample_rate();
        let window = self.window_len(rate, reference.len(), target.len());
        if window == 0 {
            return Err(AnalysisError::insufficient_data("analysis window has no samples"));
        }

        let max_lag = self.max_lag(rate, window);
        let min_overlap = self.min_overlap(window, max_lag);

        tracing::debug!(
            "Correlating {} samples at {} Hz over ±{} lags (min overlap {})",
            window,
            rate,
            max_lag,
            min_overlap
        );

        let curve = correlation_curve(
            &reference.samples()[..window],
            &target.samples()[..window],
            max_lag,
            min_overlap,
        );

        let fit = find_and_fit_peak(&curve).unwrap_or(PeakFit {
            index: max_lag,
            delta: 0.0,
            value: 0.0,
            interpolated: false,
        });

        // Nothing correlates positively (silence, noise against noise):
        // report no shift rather than the arbitrary first lag.
        let (lag_samples, peak_fitted) = if fit.value > 0.0 {
            (fit.position() - max_lag as f64, fit.interpolated)
        } else {
            (0.0, false)
        };

        let confidence = fit.value.clamp(0.0, 1.0);
        let confidence_level = ConfidenceLevel::classify(confidence, &self.config.thresholds);
        let result = SyncAnalysisResult {
            detected_offset_secs: lag_samples / rate as f64,
            lag_samples,
            confidence,
            confidence_level,
            analyzed_range: AnalyzedRange {
                start_secs: 0.0,
                end_secs: window as f64 / rate as f64,
            },
            sample_rate: rate,
            peak_fitted,
        };

        tracing::info!(
            "Detected offset {:+.3} ms (lag {:+.3} samples), confidence {:.3} ({})",
            result.detected_offset_ms(),
            result.lag_samples,
            result.confidence,
            result.confidence_level
        );

        Ok(result)
    }

    /// Run [`analyze`](Self::analyze) on tokio's blocking pool.
    ///
    /// The correlation loop is CPU-bound; this keeps it off async workers
    /// and interactive threads.
    pub async fn analyze_detached(
        &self,
        reference: Arc<Waveform>,
        target: Arc<Waveform>,
    ) -> AnalysisResult<SyncAnalysisResult> {
        let analyzer = self.clone();
        tokio::task::spawn_blocking(move || analyzer.analyze(&reference, &target))
            .await
            .map_err(|e| AnalysisError::TaskFailed(e.to_string()))?
    }

    fn window_len(&self, rate: u32, reference_len: usize, target_len: usize) -> usize {
        let ceiling = seconds_to_samples(self.config.max_window_secs, rate);
        ceiling.min(reference_len).min(target_len)
    }

    fn max_lag(&self, rate: u32, window: usize) -> usize {
        seconds_to_samples(self.config.max_lag_secs, rate).min(window.saturating_sub(1))
    }

    /// Shortest overlap that is scored.
    ///
    /// Capped at the overlap of the outermost lag, so short clips can still
    /// reach the ceiling; floored so a handful of samples cannot fake a peak.
    fn min_overlap(&self, window: usize, max_lag: usize) -> usize {
        let by_ratio =
            (window as f64 * self.config.min_overlap_ratio.clamp(0.0, 1.0)).ceil() as usize;
        by_ratio
            .min(window - max_lag)
            .max(MIN_OVERLAP_SAMPLES.min(window))
    }
}

fn seconds_to_samples(secs: f64, rate: u32) -> usize {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * rate as f64).round() as usize
}
