//! Duration probing using ffprobe.
//!
//! The remux needs the video duration to pin the output length when the
//! replacement audio is trimmed, and to place the fade-out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::ToolSettings;
use crate::process::{ProcessInvocation, ProcessRunner};

use super::types::{ExtractionError, ExtractionResult};

/// Queries media durations through ffprobe.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    runner: ProcessRunner,
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl MediaProbe {
    pub fn new(runner: ProcessRunner, ffprobe_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            runner,
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    pub fn from_settings(runner: ProcessRunner, tools: &ToolSettings) -> Self {
        Self::new(
            runner,
            &tools.ffprobe_path,
            Duration::from_secs(tools.probe_timeout_secs),
        )
    }

    /// Duration of the first video stream, falling back to the container.
    ///
    /// `Ok(None)` means ffprobe ran but reported no usable duration.
    pub async fn video_duration(
        &self,
        media: &Path,
        cancel: &CancellationToken,
    ) -> ExtractionResult<Option<f64>> {
        if !media.exists() {
            return Err(ExtractionError::SourceNotFound(media.to_path_buf()));
        }

        tracing::debug!("Probing duration: {}", media.display());

        let invocation = ProcessInvocation::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=duration:format=duration",
                "-of",
                "json",
            ])
            .arg(media)
            .with_timeout(self.timeout);

        let output = self.runner.run(&invocation, cancel).await?;
        let duration = parse_probe_duration(&output.stdout)?;

        match duration {
            Some(d) => tracing::debug!("Duration of {}: {:.3}s", media.display(), d),
            None => tracing::warn!("ffprobe reported no duration for {}", media.display()),
        }

        Ok(duration)
    }
}

/// Extract the duration from `ffprobe -of json` output.
///
/// The first stream's duration wins; the format duration is the fallback.
/// `"N/A"`, missing, non-finite and non-positive values count as unknown.
pub fn parse_probe_duration(json: &str) -> ExtractionResult<Option<f64>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ExtractionError::parse_error("ffprobe", e.to_string()))?;

    let stream_duration = value
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|streams| streams.first())
        .and_then(|stream| stream.get("duration"))
        .and_then(duration_value);

    let format_duration = value
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(duration_value);

    Ok(stream_duration.or(format_duration))
}

/// ffprobe prints durations as strings, but accept plain numbers too.
fn duration_value(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (secs.is_finite() && secs > 0.0).then_some(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_stream_duration() {
        let json = r#"{
            "programs": [],
            "streams": [{ "duration": "120.120000" }],
            "format": { "duration": "120.500000" }
        }"#;
        assert_eq!(parse_probe_duration(json).unwrap(), Some(120.12));
    }

    #[test]
    fn falls_back_to_format_duration() {
        // Matroska usually has no per-stream duration
        let json = r#"{ "streams": [{}], "format": { "duration": "42.5" } }"#;
        assert_eq!(parse_probe_duration(json).unwrap(), Some(42.5));

        let json = r#"{ "streams": [{ "duration": "N/A" }], "format": { "duration": "7" } }"#;
        assert_eq!(parse_probe_duration(json).unwrap(), Some(7.0));
    }

    #[test]
    fn unknown_when_nothing_usable() {
        assert_eq!(parse_probe_duration("{}").unwrap(), None);
        let json = r#"{ "streams": [], "format": { "duration": "N/A" } }"#;
        assert_eq!(parse_probe_duration(json).unwrap(), None);
        let json = r#"{ "format": { "duration": "0.000000" } }"#;
        assert_eq!(parse_probe_duration(json).unwrap(), None);
    }

    #[test]
    fn numeric_durations_are_accepted() {
        let json = r#"{ "format": { "duration": 12.25 } }"#;
        assert_eq!(parse_probe_duration(json).unwrap(), Some(12.25));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            parse_probe_duration("not json"),
            Err(ExtractionError::ParseError { .. })
        ));
    }

    #[tokio::test]
    async fn missing_file_is_source_not_found() {
        let probe = MediaProbe::new(
            ProcessRunner::new(crate::process::ProcessRegistry::new()),
            "ffprobe",
            Duration::from_secs(5),
        );
        let err = probe
            .video_duration(Path::new("/nonexistent/clip.mp4"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::SourceNotFound(_)));
    }
}
