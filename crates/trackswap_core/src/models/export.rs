//! Export settings shared by the session, the command builder and the CLI.

use serde::{Deserialize, Serialize};

use super::enums::{AudioCodec, OutputContainer};

/// Length of the automatic fade-in/fade-out applied at the edit points.
pub const FADE_SECONDS: f64 = 0.05;

/// Default bitrate for lossy codecs.
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 256;

/// Operator-controlled settings for one export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Signed offset of the replacement audio (positive = starts later).
    pub offset_secs: f64,
    /// Codec the replacement audio is encoded with.
    pub audio_codec: AudioCodec,
    /// Output container.
    pub output_container: OutputContainer,
    /// Apply a short fade at the start and end of the output audio.
    pub auto_fade: bool,
    /// Bitrate for lossy codecs (ignored for lossless ones).
    pub audio_bitrate_kbps: Option<u32>,
    /// Replace an existing output file.
    pub overwrite: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            offset_secs: 0.0,
            audio_codec: AudioCodec::default(),
            output_container: OutputContainer::default(),
            auto_fade: true,
            audio_bitrate_kbps: Some(DEFAULT_AUDIO_BITRATE_KBPS),
            overwrite: false,
        }
    }
}

impl ExportSettings {
    /// Builder-style offset setter.
    pub fn with_offset(mut self, offset_secs: f64) -> Self {
        self.offset_secs = offset_secs;
        self
    }

    /// Builder-style format setter.
    pub fn with_format(mut self, container: OutputContainer, codec: AudioCodec) -> Self {
        self.output_container = container;
        self.audio_codec = codec;
        self
    }

    /// Whether the chosen container can carry the chosen codec.
    pub fn is_format_compatible(&self) -> bool {
        self.output_container.supports(self.audio_codec)
    }
}
