//! Data models for TrackSwap.
//!
//! This module contains the value types shared across the crate:
//! - Enums for audio codecs and output containers
//! - The immutable [`Waveform`] signal
//! - Export settings

mod enums;
mod export;
mod waveform;

// Re-export all public types
pub use enums::{AudioCodec, OutputContainer};
pub use export::{ExportSettings, DEFAULT_AUDIO_BITRATE_KBPS, FADE_SECONDS};
pub use waveform::{downsample_peaks, Waveform, WaveformError};
