//! Decoding media files into analysis waveforms.
//!
//! ffmpeg decodes the first audio stream to a mono 32-bit float PCM file
//! at `decode_sample_rate`; the file is read back and peak-downsampled to
//! `analysis_sample_rate`. Decoding itself is left entirely to ffmpeg.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempPath;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::models::Waveform;
use crate::process::{ProcessError, ProcessInvocation, ProcessRunner};

use super::types::{DecodedTrack, ExtractionError, ExtractionResult};

/// stderr fragments ffmpeg prints when the input has no audio stream.
const NO_AUDIO_MARKERS: [&str; 2] = ["matches no streams", "does not contain any stream"];

/// Decodes media files to [`DecodedTrack`]s through ffmpeg.
#[derive(Debug, Clone)]
pub struct WaveformExtractor {
    runner: ProcessRunner,
    ffmpeg_path: PathBuf,
    decode_sample_rate: u32,
    analysis_sample_rate: u32,
    timeout: Duration,
    temp_root: Option<PathBuf>,
}

impl WaveformExtractor {
    pub fn new(runner: ProcessRunner, ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            ffmpeg_path: ffmpeg_path.into(),
            decode_sample_rate: 8000,
            analysis_sample_rate: 1000,
            timeout: Duration::from_secs(600),
            temp_root: None,
        }
    }

    /// Build an extractor from the `[tools]`, `[analysis]` and `[paths]` sections.
    pub fn from_settings(runner: ProcessRunner, settings: &Settings) -> Self {
        let temp_root = &settings.paths.temp_root;
        Self::new(runner, &settings.tools.ffmpeg_path)
            .with_rates(
                settings.analysis.decode_sample_rate,
                settings.analysis.analysis_sample_rate,
            )
            .with_timeout(Duration::from_secs(settings.tools.extract_timeout_secs))
            .with_temp_root((!temp_root.is_empty()).then(|| PathBuf::from(temp_root)))
    }

    pub fn with_rates(mut self, decode_sample_rate: u32, analysis_sample_rate: u32) -> Self {
        self.decode_sample_rate = decode_sample_rate;
        self.analysis_sample_rate = analysis_sample_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Directory for PCM files; `None` uses the system temp dir.
    pub fn with_temp_root(mut self, temp_root: Option<PathBuf>) -> Self {
        self.temp_root = temp_root;
        self
    }

    /// Decode `media` into a waveform at the analysis rate.
    pub async fn extract(
        &self,
        media: &Path,
        cancel: &CancellationToken,
    ) -> ExtractionResult<DecodedTrack> {
        if !media.exists() {
            return Err(ExtractionError::SourceNotFound(media.to_path_buf()));
        }

        let pcm = self.create_temp_file()?;
        tracing::info!("Decoding audio of {}", media.display());

        let invocation = ProcessInvocation::new(&self.ffmpeg_path)
            .args(self.build_args(media, &pcm))
            .with_timeout(self.timeout);

        match self.runner.run(&invocation, cancel).await {
            Ok(_) => {}
            Err(ProcessError::ExecutionFailed { diagnostic, .. })
                if NO_AUDIO_MARKERS.iter().any(|m| diagnostic.contains(m)) =>
            {
                return Err(ExtractionError::NoAudio(media.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }

        let decode_rate = self.decode_sample_rate;
        let analysis_rate = self.analysis_sample_rate;
        let (waveform, pcm) = tokio::task::spawn_blocking(move || {
            load_pcm(&pcm, decode_rate, analysis_rate).map(|wf| (wf, pcm))
        })
        .await
        .map_err(|e| ExtractionError::Io(std::io::Error::other(e.to_string())))??;

        if waveform.is_empty() {
            return Err(ExtractionError::NoAudio(media.to_path_buf()));
        }

        tracing::info!(
            "Decoded {}: {:.3}s, {} samples at {} Hz",
            media.display(),
            waveform.duration_secs(),
            waveform.len(),
            waveform.sample_rate()
        );

        Ok(DecodedTrack::new(media.to_path_buf(), waveform, pcm))
    }

    /// ffmpeg arguments decoding the first audio stream of `media` to `output`.
    pub fn build_args(&self, media: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(media.into());
        args.extend(
            [
                "-vn".to_string(),
                "-map".to_string(),
                "0:a:0".to_string(),
                "-ac".to_string(),
                "1".to_string(),
                "-ar".to_string(),
                self.decode_sample_rate.to_string(),
                "-f".to_string(),
                "f32le".to_string(),
                "-acodec".to_string(),
                "pcm_f32le".to_string(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }

    fn create_temp_file(&self) -> ExtractionResult<TempPath> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("trackswap-").suffix(".pcm");
        let file = match &self.temp_root {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempfile_in(dir)?
            }
            None => builder.tempfile()?,
        };
        Ok(file.into_temp_path())
    }
}

/// Read a mono f32le PCM file and reduce it to `analysis_rate`.
fn load_pcm(path: &Path, decode_rate: u32, analysis_rate: u32) -> ExtractionResult<Waveform> {
    let bytes = std::fs::read(path)?;
    if bytes.len() % 4 != 0 {
        tracing::warn!(
            "PCM file {} has {} trailing bytes; ignoring them",
            path.display(),
            bytes.len() % 4
        );
    }
    let decoded = Waveform::new(bytes_to_f32_samples(&bytes), decode_rate)?;
    Ok(decoded.resampled_to_rate(analysis_rate))
}

/// Convert raw bytes to f32 samples (little-endian).
///
/// A trailing partial sample is dropped.
pub fn bytes_to_f32_samples(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessRegistry;

    fn extractor(ffmpeg: impl Into<PathBuf>) -> WaveformExtractor {
        WaveformExtractor::new(ProcessRunner::new(ProcessRegistry::new()), ffmpeg)
    }

    #[test]
    fn bytes_to_samples_converts_correctly() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-0.25f32).to_le_bytes());
        bytes.push(0xff);

        assert_eq!(bytes_to_f32_samples(&bytes), vec![0.5f32, -0.25]);
        assert!(bytes_to_f32_samples(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn build_args_decodes_first_audio_stream_to_mono_f32() {
        let ex = extractor("ffmpeg").with_rates(16_000, 500);
        let args: Vec<String> = ex
            .build_args(Path::new("/in/movie.mkv"), Path::new("/tmp/x.pcm"))
            .into_iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(
            args,
            vec![
                "-hide_banner", "-nostdin", "-y", "-i", "/in/movie.mkv", "-vn", "-map", "0:a:0",
                "-ac", "1", "-ar", "16000", "-f", "f32le", "-acodec", "pcm_f32le", "/tmp/x.pcm",
            ]
        );
    }

    #[test]
    fn load_pcm_downsamples_to_analysis_rate() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let samples: Vec<u8> = (0..400)
            .flat_map(|i| (if i == 123 { -0.9f32 } else { 0.1f32 }).to_le_bytes())
            .collect();
        std::fs::write(file.path(), samples).unwrap();

        let wf = load_pcm(file.path(), 400, 20).unwrap();
        assert_eq!(wf.sample_rate(), 20);
        assert_eq!(wf.len(), 20);
        assert!((wf.duration_secs() - 1.0).abs() < 1e-9);
        assert_eq!(wf.samples()[6], -0.9);
    }

    #[tokio::test]
    async fn missing_source_is_reported_before_launch() {
        let err = extractor("/nonexistent/ffmpeg")
            .extract(Path::new("/nonexistent/clip.mov"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::SourceNotFound(_)));
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn extract_reads_tool_output_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("clip.mov");
        std::fs::write(&media, b"not really a movie").unwrap();

        // Writes 100 samples of 0.5 (0x3f000000 little-endian) to the last argument
        let tool = fake_tool(
            dir.path(),
            r#"for last; do :; done
i=0
while [ $i -lt 100 ]; do printf '\000\000\000\077'; i=$((i+1)); done > "$last""#,
        );

        let ex = extractor(tool)
            .with_rates(100, 10)
            .with_temp_root(Some(dir.path().join("tmp")));
        let track = ex.extract(&media, &CancellationToken::new()).await.unwrap();

        let waveform = track.waveform();
        assert_eq!(waveform.sample_rate(), 10);
        assert_eq!(waveform.len(), 10);
        assert!(waveform.samples().iter().all(|s| *s == 0.5));
        assert_eq!(track.source(), media.as_path());

        let pcm = track.pcm_path().to_path_buf();
        assert!(pcm.starts_with(dir.path().join("tmp")));
        assert!(pcm.exists());
        drop(track);
        assert!(!pcm.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_audio_stream_is_no_audio() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("silent.mp4");
        std::fs::write(&media, b"x").unwrap();
        let tool = fake_tool(
            dir.path(),
            "echo \"Stream map '0:a:0' matches no streams.\" >&2\nexit 1",
        );

        let err = extractor(tool)
            .extract(&media, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::NoAudio(_)), "{:?}", err);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_failure_is_process_error() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("broken.mp4");
        std::fs::write(&media, b"x").unwrap();
        let tool = fake_tool(dir.path(), "echo 'Invalid data found' >&2\nexit 1");

        let err = extractor(tool)
            .extract(&media, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Process(ProcessError::ExecutionFailed { .. })
        ));
        assert!(!err.is_cancelled());
    }
}
