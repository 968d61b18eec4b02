//! ffmpeg remux options builder.
//!
//! Builds command-line tokens for ffmpeg from a [`RemuxRequest`]. The
//! video stream of the first input is copied untouched; only the audio
//! stream of the second input is encoded.
//!
//! # Offset handling
//!
//! - **Positive offset**: audio starts later. An `adelay` filter inserts
//!   silence in front of the audio; the video input is not touched.
//! - **Negative offset**: the audio head is trimmed with an input-side `-ss`
//!   on the audio input. Output length is pinned to the video duration with
//!   `-t`, otherwise ffmpeg would stop at the shorter (trimmed) audio.
//! - **Zero**: neither adjustment; `-shortest` bounds the output.

use std::path::Path;

use crate::models::{ExportSettings, FADE_SECONDS};

use super::types::{MuxError, MuxResult, RemuxRequest};

/// Offsets below this magnitude are treated as zero.
const OFFSET_EPSILON: f64 = 1e-6;

/// Options the builder emits without a value.
const FLAGS_WITHOUT_VALUE: [&str; 5] = ["-hide_banner", "-nostdin", "-y", "-n", "-shortest"];

/// Builder for ffmpeg remux command-line options.
///
/// Generates the argument list (without the program name) for one export.
pub struct RemuxCommandBuilder<'a> {
    request: &'a RemuxRequest,
}

impl<'a> RemuxCommandBuilder<'a> {
    /// Create a new options builder.
    pub fn new(request: &'a RemuxRequest) -> Self {
        Self { request }
    }

    /// Validate the request and build the ffmpeg tokens.
    pub fn build(&self) -> MuxResult<Vec<String>> {
        self.validate()?;

        let settings = &self.request.settings;
        let offset = effective_offset(settings.offset_secs);
        let duration = self.request.known_duration();
        let mut tokens = Vec::new();

        tokens.push("-hide_banner".to_string());
        tokens.push("-nostdin".to_string());
        tokens.push(if settings.overwrite { "-y" } else { "-n" }.to_string());

        // Input 0: video, never shifted
        tokens.push("-i".to_string());
        tokens.push(path_token(&self.request.video_path)?);

        // Input 1: audio, head trimmed for negative offsets
        if offset < 0.0 {
            tokens.push("-ss".to_string());
            tokens.push(format_secs(-offset));
        }
        tokens.push("-i".to_string());
        tokens.push(path_token(&self.request.audio_path)?);

        tokens.push("-map".to_string());
        tokens.push("0:v:0".to_string());
        tokens.push("-map".to_string());
        tokens.push("1:a:0".to_string());
        tokens.push("-c:v".to_string());
        tokens.push("copy".to_string());
        tokens.push("-c:a".to_string());
        tokens.push(settings.audio_codec.encoder().to_string());

        if settings.audio_codec.is_lossy() {
            if let Some(kbps) = settings.audio_bitrate_kbps {
                tokens.push("-b:a".to_string());
                tokens.push(format!("{}k", kbps));
            }
        }

        let filters = self.audio_filters(offset, duration);
        if !filters.is_empty() {
            tokens.push("-af".to_string());
            tokens.push(filters.join(","));
        }

        match duration {
            Some(d) if offset < 0.0 => {
                tokens.push("-t".to_string());
                tokens.push(format_secs(d));
            }
            _ => tokens.push("-shortest".to_string()),
        }

        if settings.output_container.is_quicktime_family() {
            tokens.push("-movflags".to_string());
            tokens.push("+faststart".to_string());
        }

        tokens.push(path_token(&self.request.output_path)?);

        tracing::debug!(
            "ffmpeg remux: offset={:+.3}s duration={:?} codec={} container={}",
            offset,
            duration,
            settings.audio_codec,
            settings.output_container
        );

        Ok(tokens)
    }

    /// Check the request before any tokens are produced.
    fn validate(&self) -> MuxResult<()> {
        let settings = &self.request.settings;
        check_settings(settings)?;

        if effective_offset(settings.offset_secs) < 0.0 && self.request.known_duration().is_none()
        {
            return Err(MuxError::DurationUnknown);
        }

        Ok(())
    }

    /// Audio filter chain: delay first, then fades on the output timeline.
    fn audio_filters(&self, offset: f64, duration: Option<f64>) -> Vec<String> {
        let mut filters = Vec::new();

        if offset > 0.0 {
            filters.push(format!("adelay={:.3}:all=1", offset * 1000.0));
        }

        if self.request.settings.auto_fade {
            // Fades are only placed when the end of the output is known
            if let Some(d) = duration {
                let fade = format_secs(FADE_SECONDS);
                filters.push(format!("afade=t=in:st=0:d={}", fade));
                filters.push(format!(
                    "afade=t=out:st={}:d={}",
                    format_secs((d - FADE_SECONDS).max(0.0)),
                    fade
                ));
            }
        }

        filters
    }
}

/// Checks that need no media information: offset finite, codec fits container.
pub fn check_settings(settings: &ExportSettings) -> MuxResult<()> {
    if !settings.offset_secs.is_finite() {
        return Err(MuxError::InvalidOffset(settings.offset_secs));
    }

    if !settings.is_format_compatible() {
        return Err(MuxError::IncompatibleFormat {
            container: settings.output_container,
            codec: settings.audio_codec,
        });
    }

    Ok(())
}

/// Whether a remux with `settings` needs the video duration.
///
/// Always for a negative offset; for fades only when they are enabled.
pub fn needs_duration(settings: &ExportSettings) -> bool {
    effective_offset(settings.offset_secs) < 0.0 || settings.auto_fade
}

fn effective_offset(offset_secs: f64) -> f64 {
    if offset_secs.abs() < OFFSET_EPSILON {
        0.0
    } else {
        offset_secs
    }
}

fn path_token(path: &Path) -> MuxResult<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| MuxError::NonUtf8Path(path.to_path_buf()))
}

fn format_secs(secs: f64) -> String {
    format!("{:.3}", secs)
}

/// Format tokens for pretty display (one option per line).
pub fn format_tokens_pretty(program: &str, tokens: &[String]) -> String {
    let mut result = format!("{} \\\n", program);
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        let is_last = |idx: usize| idx + 1 >= tokens.len();

        let takes_value =
            token.starts_with('-') && !FLAGS_WITHOUT_VALUE.contains(&token.as_str());
        if takes_value && i + 1 < tokens.len() && !tokens[i + 1].starts_with('-') {
            // Option with value
            let end = if is_last(i + 1) { "\n" } else { " \\\n" };
            result.push_str(&format!("  {} {}{}", token, quote_if_needed(&tokens[i + 1]), end));
            i += 2;
        } else {
            let end = if is_last(i) { "\n" } else { " \\\n" };
            result.push_str(&format!("  {}{}", quote_if_needed(token), end));
            i += 1;
        }
    }

    result
}

fn quote_if_needed(token: &str) -> String {
    if token.contains(char::is_whitespace) {
        format!("'{}'", token.replace('\'', "'\\''"))
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AudioCodec, OutputContainer};

    fn request(offset: f64, duration: Option<f64>) -> RemuxRequest {
        RemuxRequest::new(
            "/media/video.mp4",
            "/media/dub.wav",
            "/media/out.mp4",
            ExportSettings::default().with_offset(offset),
        )
        .with_video_duration(duration)
    }

    fn value_after<'t>(tokens: &'t [String], flag: &str) -> Option<&'t str> {
        tokens
            .iter()
            .position(|t| t == flag)
            .and_then(|i| tokens.get(i + 1))
            .map(String::as_str)
    }

    fn index_of(tokens: &[String], value: &str) -> usize {
        tokens.iter().position(|t| t == value).unwrap()
    }

    #[test]
    fn copies_video_and_maps_both_inputs() {
        let tokens = RemuxCommandBuilder::new(&request(0.0, Some(60.0)))
            .build()
            .unwrap();

        assert_eq!(value_after(&tokens, "-c:v"), Some("copy"));
        assert_eq!(value_after(&tokens, "-c:a"), Some("aac"));
        let maps: Vec<_> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| *t == "-map")
            .map(|(i, _)| tokens[i + 1].as_str())
            .collect();
        assert_eq!(maps, vec!["0:v:0", "1:a:0"]);
        assert_eq!(tokens.last().unwrap(), "/media/out.mp4");
    }

    #[test]
    fn zero_offset_applies_no_shift() {
        let tokens = RemuxCommandBuilder::new(&request(0.0, None)).build().unwrap();

        assert!(!tokens.contains(&"-ss".to_string()));
        assert!(!tokens.iter().any(|t| t.contains("adelay")));
        assert!(!tokens.contains(&"-t".to_string()));
        assert!(tokens.contains(&"-shortest".to_string()));
    }

    #[test]
    fn positive_offset_delays_audio_only() {
        let tokens = RemuxCommandBuilder::new(&request(0.5, None)).build().unwrap();

        let filters = value_after(&tokens, "-af").unwrap();
        assert!(filters.starts_with("adelay=500.000:all=1"), "{}", filters);
        // Video input comes first and has no input options in front of it
        let video_idx = index_of(&tokens, "/media/video.mp4");
        assert_eq!(tokens[video_idx - 1], "-i");
        assert!(!tokens[..video_idx].contains(&"-ss".to_string()));
        assert!(!tokens.contains(&"-itsoffset".to_string()));
        assert!(tokens.contains(&"-shortest".to_string()));
    }

    #[test]
    fn negative_offset_without_duration_fails() {
        let err = RemuxCommandBuilder::new(&request(-2.5, None))
            .build()
            .unwrap_err();
        assert_eq!(err, MuxError::DurationUnknown);

        let err = RemuxCommandBuilder::new(&request(-2.5, Some(f64::NAN)))
            .build()
            .unwrap_err();
        assert_eq!(err, MuxError::DurationUnknown);
    }

    #[test]
    fn negative_offset_trims_audio_and_pins_duration() {
        let tokens = RemuxCommandBuilder::new(&request(-2.5, Some(120.0)))
            .build()
            .unwrap();

        // -ss sits between the video input and the audio input
        let ss_idx = index_of(&tokens, "-ss");
        assert_eq!(tokens[ss_idx + 1], "2.500");
        assert!(ss_idx > index_of(&tokens, "/media/video.mp4"));
        assert!(ss_idx < index_of(&tokens, "/media/dub.wav"));

        assert_eq!(value_after(&tokens, "-t"), Some("120.000"));
        assert!(!tokens.contains(&"-shortest".to_string()));
    }

    #[test]
    fn fades_use_known_duration() {
        let tokens = RemuxCommandBuilder::new(&request(0.0, Some(90.0)))
            .build()
            .unwrap();

        let filters = value_after(&tokens, "-af").unwrap();
        assert_eq!(
            filters,
            "afade=t=in:st=0:d=0.050,afade=t=out:st=89.950:d=0.050"
        );
    }

    #[test]
    fn fades_are_skipped_without_duration() {
        let tokens = RemuxCommandBuilder::new(&request(0.0, None)).build().unwrap();
        assert!(value_after(&tokens, "-af").is_none());
    }

    #[test]
    fn fades_follow_delay_in_filter_chain() {
        let tokens = RemuxCommandBuilder::new(&request(1.25, Some(30.0)))
            .build()
            .unwrap();
        let filters = value_after(&tokens, "-af").unwrap();
        let parts: Vec<_> = filters.split(',').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "adelay=1250.000:all=1");
        assert!(parts[1].starts_with("afade=t=in"));
        assert!(parts[2].starts_with("afade=t=out:st=29.950"));
    }

    #[test]
    fn fades_disabled_by_settings() {
        let mut req = request(0.0, Some(90.0));
        req.settings.auto_fade = false;
        let tokens = RemuxCommandBuilder::new(&req).build().unwrap();
        assert!(value_after(&tokens, "-af").is_none());
    }

    #[test]
    fn incompatible_format_is_rejected() {
        let mut req = request(0.0, Some(10.0));
        req.settings = req
            .settings
            .with_format(OutputContainer::Mp4, AudioCodec::Pcm);

        let err = RemuxCommandBuilder::new(&req).build().unwrap_err();
        assert_eq!(
            err,
            MuxError::IncompatibleFormat {
                container: OutputContainer::Mp4,
                codec: AudioCodec::Pcm
            }
        );
        assert!(err.to_string().contains("mp4"));
        assert!(err.to_string().contains("pcm"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_are_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        use std::path::PathBuf;

        let odd = PathBuf::from(OsStr::from_bytes(b"/media/caf\xe9.mkv"));

        let mut req = request(0.0, Some(10.0));
        req.output_path = odd.clone();
        assert_eq!(
            RemuxCommandBuilder::new(&req).build().unwrap_err(),
            MuxError::NonUtf8Path(odd.clone())
        );

        let mut req = request(0.0, Some(10.0));
        req.audio_path = odd.clone();
        assert_eq!(
            RemuxCommandBuilder::new(&req).build().unwrap_err(),
            MuxError::NonUtf8Path(odd)
        );
    }

    #[test]
    fn non_finite_offset_is_rejected() {
        let err = RemuxCommandBuilder::new(&request(f64::INFINITY, Some(10.0)))
            .build()
            .unwrap_err();
        assert!(matches!(err, MuxError::InvalidOffset(_)));
    }

    #[test]
    fn tiny_negative_offset_is_treated_as_zero() {
        let tokens = RemuxCommandBuilder::new(&request(-1e-9, None)).build().unwrap();
        assert!(!tokens.contains(&"-ss".to_string()));
    }

    #[test]
    fn bitrate_only_for_lossy_codecs() {
        let mut req = request(0.0, None);
        let tokens = RemuxCommandBuilder::new(&req).build().unwrap();
        assert_eq!(value_after(&tokens, "-b:a"), Some("256k"));

        req.settings = req
            .settings
            .with_format(OutputContainer::Mkv, AudioCodec::Flac);
        let tokens = RemuxCommandBuilder::new(&req).build().unwrap();
        assert!(value_after(&tokens, "-b:a").is_none());
        assert!(!tokens.contains(&"-movflags".to_string()));
    }

    #[test]
    fn overwrite_flag_selects_y_or_n() {
        let mut req = request(0.0, None);
        let tokens = RemuxCommandBuilder::new(&req).build().unwrap();
        assert!(tokens.contains(&"-n".to_string()));

        req.settings.overwrite = true;
        let tokens = RemuxCommandBuilder::new(&req).build().unwrap();
        assert!(tokens.contains(&"-y".to_string()));
    }

    #[test]
    fn needs_duration_for_trim_or_fade() {
        let mut settings = ExportSettings::default().with_offset(0.5);
        assert!(needs_duration(&settings));
        settings.auto_fade = false;
        assert!(!needs_duration(&settings));
        assert!(needs_duration(&settings.clone().with_offset(-0.5)));
    }

    #[test]
    fn pretty_format_pairs_options() {
        let tokens: Vec<String> = ["-i", "/a b.mp4", "-shortest", "out.mp4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let pretty = format_tokens_pretty("ffmpeg", &tokens);
        assert_eq!(
            pretty,
            "ffmpeg \\\n  -i '/a b.mp4' \\\n  -shortest \\\n  out.mp4\n"
        );
    }

    #[test]
    fn pretty_format_of_built_command_keeps_every_token() {
        let mut req = request(-1.0, Some(12.0));
        req.settings = req
            .settings
            .with_format(OutputContainer::Mkv, AudioCodec::Flac);
        let tokens = RemuxCommandBuilder::new(&req).build().unwrap();
        let pretty = format_tokens_pretty("ffmpeg", &tokens);

        assert!(pretty.contains("\n  -ss 1.000 \\\n"));
        assert!(pretty.contains("\n  -t 12.000 \\\n"));
        assert!(pretty.ends_with("\n  /media/out.mp4\n"));
        // Program, three bare flags, nine option pairs, output
        assert_eq!(tokens.len(), 22);
        assert_eq!(pretty.lines().count(), 14);
    }
}
