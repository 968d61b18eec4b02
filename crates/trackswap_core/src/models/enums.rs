//! Core enums used throughout the application.

use serde::{Deserialize, Serialize};

/// Audio codec the replacement track is encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// AAC-LC.
    #[default]
    Aac,
    /// Apple Lossless.
    Alac,
    /// FLAC.
    Flac,
    /// MPEG-1 Layer III.
    Mp3,
    /// Opus.
    Opus,
    /// Dolby Digital.
    Ac3,
    /// Uncompressed 16-bit little-endian PCM.
    Pcm,
}

impl AudioCodec {
    /// All codecs, in display order.
    pub const ALL: [AudioCodec; 7] = [
        AudioCodec::Aac,
        AudioCodec::Alac,
        AudioCodec::Flac,
        AudioCodec::Mp3,
        AudioCodec::Opus,
        AudioCodec::Ac3,
        AudioCodec::Pcm,
    ];

    /// ffmpeg encoder name passed to `-c:a`.
    pub fn encoder(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Alac => "alac",
            AudioCodec::Flac => "flac",
            AudioCodec::Mp3 => "libmp3lame",
            AudioCodec::Opus => "libopus",
            AudioCodec::Ac3 => "ac3",
            AudioCodec::Pcm => "pcm_s16le",
        }
    }

    /// Whether the codec takes a target bitrate.
    pub fn is_lossy(&self) -> bool {
        matches!(
            self,
            AudioCodec::Aac | AudioCodec::Mp3 | AudioCodec::Opus | AudioCodec::Ac3
        )
    }
}

impl std::fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioCodec::Aac => write!(f, "aac"),
            AudioCodec::Alac => write!(f, "alac"),
            AudioCodec::Flac => write!(f, "flac"),
            AudioCodec::Mp3 => write!(f, "mp3"),
            AudioCodec::Opus => write!(f, "opus"),
            AudioCodec::Ac3 => write!(f, "ac3"),
            AudioCodec::Pcm => write!(f, "pcm"),
        }
    }
}

impl std::str::FromStr for AudioCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aac" => Ok(AudioCodec::Aac),
            "alac" => Ok(AudioCodec::Alac),
            "flac" => Ok(AudioCodec::Flac),
            "mp3" => Ok(AudioCodec::Mp3),
            "opus" => Ok(AudioCodec::Opus),
            "ac3" => Ok(AudioCodec::Ac3),
            "pcm" => Ok(AudioCodec::Pcm),
            other => Err(format!("unknown audio codec '{}'", other)),
        }
    }
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputContainer {
    /// MPEG-4 Part 14.
    #[default]
    Mp4,
    /// QuickTime.
    Mov,
    /// Matroska.
    Mkv,
}

impl OutputContainer {
    /// Codecs this container can carry.
    pub fn supported_codecs(&self) -> &'static [AudioCodec] {
        match self {
            OutputContainer::Mp4 => &[
                AudioCodec::Aac,
                AudioCodec::Alac,
                AudioCodec::Mp3,
                AudioCodec::Ac3,
            ],
            OutputContainer::Mov => &[AudioCodec::Aac, AudioCodec::Alac, AudioCodec::Pcm],
            OutputContainer::Mkv => &AudioCodec::ALL,
        }
    }

    /// Check whether `codec` can be muxed into this container.
    pub fn supports(&self, codec: AudioCodec) -> bool {
        self.supported_codecs().contains(&codec)
    }

    /// Conventional file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputContainer::Mp4 => "mp4",
            OutputContainer::Mov => "mov",
            OutputContainer::Mkv => "mkv",
        }
    }

    /// Whether the muxer understands `-movflags`.
    pub fn is_quicktime_family(&self) -> bool {
        matches!(self, OutputContainer::Mp4 | OutputContainer::Mov)
    }
}

impl std::fmt::Display for OutputContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl std::str::FromStr for OutputContainer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" | "m4v" => Ok(OutputContainer::Mp4),
            "mov" => Ok(OutputContainer::Mov),
            "mkv" | "matroska" => Ok(OutputContainer::Mkv),
            other => Err(format!("unknown output container '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mkv_supports_every_codec() {
        for codec in AudioCodec::ALL {
            assert!(OutputContainer::Mkv.supports(codec), "{}", codec);
        }
    }

    #[test]
    fn mp4_rejects_pcm_and_flac() {
        assert!(!OutputContainer::Mp4.supports(AudioCodec::Pcm));
        assert!(!OutputContainer::Mp4.supports(AudioCodec::Flac));
        assert!(OutputContainer::Mp4.supports(AudioCodec::Aac));
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("AAC".parse::<AudioCodec>().unwrap(), AudioCodec::Aac);
        assert_eq!("Matroska".parse::<OutputContainer>().unwrap(), OutputContainer::Mkv);
        assert!("wma".parse::<AudioCodec>().is_err());
    }

    #[test]
    fn codec_serializes_lowercase() {
        let json = serde_json::to_string(&AudioCodec::Opus).unwrap();
        assert_eq!(json, "\"opus\"");
    }
}
