//! Downsampled mono signal used for both display and sync analysis.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing a [`Waveform`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaveformError {
    #[error("Waveform sample rate must be positive")]
    ZeroSampleRate,
}

/// Immutable mono amplitude-over-time signal.
///
/// Samples are normalized into `[-1.0, 1.0]`. The sample rate is the
/// analysis rate after downsampling, not the rate the source was decoded at.
/// Deserialization goes through [`Waveform::with_duration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWaveform")]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
    duration_secs: f64,
}

#[derive(Deserialize)]
struct RawWaveform {
    samples: Vec<f32>,
    sample_rate: u32,
    duration_secs: f64,
}

impl TryFrom<RawWaveform> for Waveform {
    type Error = WaveformError;

    fn try_from(raw: RawWaveform) -> Result<Self, Self::Error> {
        Self::with_duration(raw.samples, raw.sample_rate, raw.duration_secs)
    }
}

impl Waveform {
    /// Create a waveform, deriving the duration from the sample count.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, WaveformError> {
        if sample_rate == 0 {
            return Err(WaveformError::ZeroSampleRate);
        }
        let duration_secs = samples.len() as f64 / sample_rate as f64;
        Self::with_duration(samples, sample_rate, duration_secs)
    }

    /// Create a waveform with an explicit (informational) duration.
    ///
    /// Out-of-range and non-finite samples are clamped into `[-1.0, 1.0]`.
    pub fn with_duration(
        mut samples: Vec<f32>,
        sample_rate: u32,
        duration_secs: f64,
    ) -> Result<Self, WaveformError> {
        if sample_rate == 0 {
            return Err(WaveformError::ZeroSampleRate);
        }
        for s in samples.iter_mut() {
            *s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
        }
        Ok(Self {
            samples,
            sample_rate,
            duration_secs: duration_secs.max(0.0),
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples covering `[start_secs, end_secs)`.
    ///
    /// Indices are clamped to the valid range; an empty slice is returned
    /// when the clamped start is not before the clamped end.
    pub fn samples_in_range(&self, start_secs: f64, end_secs: f64) -> &[f32] {
        let start = self.index_for(start_secs);
        let end = self.index_for(end_secs);
        if start >= end {
            return &[];
        }
        &self.samples[start..end]
    }

    /// Peak-preserving reduction to `target_count` samples.
    ///
    /// Returns an identical copy when `target_count >= len()`. The sample
    /// rate is rescaled with the count so that time positions stay valid.
    pub fn downsampled(&self, target_count: usize) -> Waveform {
        if target_count >= self.samples.len() {
            return self.clone();
        }
        let ratio = target_count as f64 / self.samples.len() as f64;
        let sample_rate = ((self.sample_rate as f64 * ratio).round() as u32).max(1);
        Waveform {
            samples: downsample_peaks(&self.samples, target_count),
            sample_rate,
            duration_secs: self.duration_secs,
        }
    }

    /// Peak-preserving reduction to `target_rate` Hz.
    ///
    /// No-op when the target rate is not lower than the current one.
    pub fn resampled_to_rate(&self, target_rate: u32) -> Waveform {
        if target_rate == 0 || target_rate >= self.sample_rate {
            return self.clone();
        }
        let target_count = (self.samples.len() as f64 * target_rate as f64
            / self.sample_rate as f64)
            .ceil() as usize;
        if target_count >= self.samples.len() {
            return self.clone();
        }
        Waveform {
            samples: downsample_peaks(&self.samples, target_count),
            sample_rate: target_rate,
            duration_secs: self.duration_secs,
        }
    }

    fn index_for(&self, secs: f64) -> usize {
        if !secs.is_finite() || secs <= 0.0 {
            return 0;
        }
        let idx = (secs * self.sample_rate as f64).floor();
        (idx as usize).min(self.samples.len())
    }
}

/// Keep the largest-magnitude sample of each of `target_count` buckets.
///
/// Buckets are contiguous and cover `[i * len / target, (i + 1) * len / target)`.
/// Ties keep the earliest sample. Inputs already at or below the target are
/// returned unchanged.
pub fn downsample_peaks(samples: &[f32], target_count: usize) -> Vec<f32> {
    let len = samples.len();
    if target_count >= len {
        return samples.to_vec();
    }

    (0..target_count)
        .map(|bucket| {
            let start = bucket * len / target_count;
            let end = ((bucket + 1) * len / target_count).max(start + 1);
            samples[start + 1..end]
                .iter()
                .copied()
                .fold(samples[start], |peak, s| if s.abs() > peak.abs() { s } else { peak })
        })
        .collect()
}
