//! Media file extraction module.
//!
//! Everything that asks the external tools about a media file:
//!
//! - **Probe**: video duration via ffprobe (needed by the remux)
//! - **Waveform**: decode the first audio stream to a temporary mono PCM
//!   file via ffmpeg and load it as a [`Waveform`](crate::models::Waveform)
//!
//! Both run through [`ProcessRunner`](crate::process::ProcessRunner), so they
//! honour timeouts and cancellation.
//!
//! # Usage
//!
//! ```ignore
//! use trackswap_core::extraction::{MediaProbe, WaveformExtractor};
//!
//! let extractor = WaveformExtractor::from_settings(runner.clone(), &settings);
//! let track = extractor.extract(Path::new("/path/to/movie.mp4"), &cancel).await?;
//!
//! let probe = MediaProbe::from_settings(runner, &settings.tools);
//! let duration = probe.video_duration(Path::new("/path/to/movie.mp4"), &cancel).await?;
//! ```

mod probe;
mod types;
mod waveform;

pub use probe::{parse_probe_duration, MediaProbe};
pub use types::{DecodedTrack, ExtractionError, ExtractionResult};
pub use waveform::{bytes_to_f32_samples, WaveformExtractor};
