//! Reading, validating and writing the TrackSwap config file.
//!
//! Writes go to a sibling `.toml.tmp` file that is then renamed over the
//! config, so a crash never leaves a half-written file. Single-section
//! updates go through toml_edit and leave the rest of the file (including
//! hand-written comments) as it is on disk.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Config file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O failed: {0}")]
    ReadError(#[from] io::Error),

    #[error("Config is not valid TOML for TrackSwap: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Could not serialize settings: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Could not open config for section update: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("No config file at {0}")]
    NotFound(PathBuf),

    #[error("Invalid setting '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the in-memory [`Settings`] and the file they came from.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Manager for `config_path` holding default settings; nothing is read yet.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory edits; persisted by [`save`](Self::save) or
    /// [`update_section`](Self::update_section).
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read and validate the file. A missing file is [`ConfigError::NotFound`].
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.is_file() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }
        self.read_validated()?;
        Ok(())
    }

    /// Like [`load`](Self::load), but writes a default file when none exists.
    ///
    /// Sections missing from an existing file are appended with defaults;
    /// sections already present are left as the user wrote them.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.config_path.is_file() {
            self.settings = Settings::default();
            self.save()?;
            tracing::info!("Wrote default config to {}", self.config_path.display());
            return Ok(());
        }

        let raw = self.read_validated()?;
        let doc: DocumentMut = raw.parse()?;
        let missing: Vec<ConfigSection> = ConfigSection::ALL
            .into_iter()
            .filter(|s| !doc.contains_key(s.table_name()))
            .collect();

        for section in &missing {
            tracing::debug!("Adding missing config section [{}]", section.table_name());
            self.update_section(*section)?;
        }

        Ok(())
    }

    /// Create the configured output, log and temp directories.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        for dir in [&paths.output_folder, &paths.logs_folder, &paths.temp_root] {
            if dir.is_empty() {
                continue;
            }
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Rewrite the whole file from the in-memory settings.
    pub fn save(&self) -> ConfigResult<()> {
        validate(&self.settings)?;
        let rendered = self.render_annotated()?;
        self.write_atomically(&rendered)?;
        Ok(())
    }

    /// Persist one section, leaving every other table as it is on disk.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        validate(&self.settings)?;

        let on_disk = match fs::read_to_string(&self.config_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let mut doc = if on_disk.trim().is_empty() {
            DocumentMut::new()
        } else {
            on_disk.parse::<DocumentMut>()?
        };

        let fresh: DocumentMut = self.section_toml(section)?.parse()?;
        doc[section.table_name()] = Item::Table(fresh.as_table().clone());

        self.write_atomically(&doc.to_string())?;
        Ok(())
    }

    /// Parse and validate the file, install the settings, return the raw text.
    fn read_validated(&mut self) -> ConfigResult<String> {
        let raw = fs::read_to_string(&self.config_path)?;
        let settings: Settings = toml::from_str(&raw)?;
        validate(&settings)?;
        self.settings = settings;
        Ok(raw)
    }

    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let s = &self.settings;
        let content = match section {
            ConfigSection::Paths => toml::to_string_pretty(&s.paths)?,
            ConfigSection::Tools => toml::to_string_pretty(&s.tools)?,
            ConfigSection::Analysis => toml::to_string_pretty(&s.analysis)?,
            ConfigSection::Export => toml::to_string_pretty(&s.export)?,
            ConfigSection::Logging => toml::to_string_pretty(&s.logging)?,
        };
        Ok(content)
    }

    /// Full file text with a comment line above every table.
    fn render_annotated(&self) -> ConfigResult<String> {
        let mut text = String::from(
            "# TrackSwap settings\n# Edit freely; section updates keep comments in other sections.\n\n",
        );

        for section in ConfigSection::ALL {
            text.push_str(&format!(
                "# {}\n[{}]\n{}\n",
                section.description(),
                section.table_name(),
                self.section_toml(section)?
            ));
        }

        Ok(text)
    }

    fn write_atomically(&self, text: &str) -> io::Result<()> {
        match self.config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)?,
            _ => {}
        }

        // Sibling file so the rename stays on one filesystem
        let staging = self.config_path.with_extension("toml.tmp");
        let mut file = fs::File::create(&staging)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staging, &self.config_path)
    }
}

/// Reject values the analyzer or exporter cannot work with.
pub fn validate(settings: &Settings) -> ConfigResult<()> {
    let a = &settings.analysis;

    if !(a.max_window_secs.is_finite() && a.max_window_secs > 0.0) {
        return Err(ConfigError::invalid(
            "analysis.max_window_secs",
            "must be a positive number",
        ));
    }
    if !(a.max_lag_secs.is_finite() && a.max_lag_secs >= 0.0) {
        return Err(ConfigError::invalid(
            "analysis.max_lag_secs",
            "must be zero or positive",
        ));
    }
    if !(0.0..=1.0).contains(&a.min_overlap_ratio) {
        return Err(ConfigError::invalid(
            "analysis.min_overlap_ratio",
            "must be within [0, 1]",
        ));
    }
    if !(0.0..=1.0).contains(&a.medium_confidence_threshold)
        || !(0.0..=1.0).contains(&a.high_confidence_threshold)
    {
        return Err(ConfigError::invalid(
            "analysis.*_confidence_threshold",
            "must be within [0, 1]",
        ));
    }
    if a.medium_confidence_threshold > a.high_confidence_threshold {
        return Err(ConfigError::invalid(
            "analysis.medium_confidence_threshold",
            "must not exceed high_confidence_threshold",
        ));
    }
    if a.decode_sample_rate == 0 || a.analysis_sample_rate == 0 {
        return Err(ConfigError::invalid(
            "analysis.*_sample_rate",
            "must be positive",
        ));
    }
    if a.analysis_sample_rate > a.decode_sample_rate {
        return Err(ConfigError::invalid(
            "analysis.analysis_sample_rate",
            "must not exceed decode_sample_rate",
        ));
    }

    let t = &settings.tools;
    if t.ffmpeg_path.trim().is_empty() {
        return Err(ConfigError::invalid("tools.ffmpeg_path", "must not be empty"));
    }
    if t.ffprobe_path.trim().is_empty() {
        return Err(ConfigError::invalid("tools.ffprobe_path", "must not be empty"));
    }
    if t.probe_timeout_secs == 0 || t.extract_timeout_secs == 0 || t.export_timeout_secs == 0 {
        return Err(ConfigError::invalid("tools.*_timeout_secs", "must be positive"));
    }

    let e = &settings.export;
    if !e.output_container.supports(e.audio_codec) {
        return Err(ConfigError::invalid(
            "export.audio_codec",
            format!(
                "'{}' cannot be stored in '{}'",
                e.audio_codec, e.output_container
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use crate::models::{AudioCodec, OutputContainer};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn first_run_writes_loadable_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("trackswap.toml");

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        for section in ConfigSection::ALL {
            assert!(text.contains(&format!("[{}]", section.table_name())));
        }
        assert!(text.contains("# Sync analysis"));

        let mut reloaded = ConfigManager::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings(), &Settings::default());
    }

    #[test]
    fn partial_file_gains_missing_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trackswap.toml");
        fs::write(
            &path,
            "# my tools\n[tools]\nffmpeg_path = \"/usr/local/bin/ffmpeg\"\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();
        assert_eq!(manager.settings().tools.ffmpeg_path, "/usr/local/bin/ffmpeg");

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("# my tools"));
        assert!(text.contains("[analysis]"));
        assert!(text.contains("[logging]"));
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");
        fs::write(&config_path, "[analysis\nmax_lag_secs = ").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        assert!(matches!(manager.load(), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn invalid_values_are_rejected_on_load() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("settings.toml");
        fs::write(
            &config_path,
            "[export]\noutput_container = \"mp4\"\naudio_codec = \"flac\"\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        match manager.load() {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "export.audio_codec"),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn validate_checks_thresholds_and_rates() {
        let mut settings = Settings::default();
        assert!(validate(&settings).is_ok());

        settings.analysis.medium_confidence_threshold = 0.9;
        assert!(validate(&settings).is_err());

        let mut settings = Settings::default();
        settings.analysis.analysis_sample_rate = 16_000;
        assert!(validate(&settings).is_err());

        let mut settings = Settings::default();
        settings.analysis.min_overlap_ratio = 1.5;
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn section_update_keeps_hand_edits_elsewhere() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trackswap.toml");

        let mut manager = ConfigManager::new(&path);
        manager.load_or_create().unwrap();

        let edited = fs::read_to_string(&path)
            .unwrap()
            .replace("ffprobe_path = \"ffprobe\"", "ffprobe_path = \"/x/ffprobe\"");
        fs::write(&path, edited).unwrap();

        manager.settings_mut().logging.level = LogLevel::Debug;
        manager.settings_mut().export.output_container = OutputContainer::Mkv;
        manager.settings_mut().export.audio_codec = AudioCodec::Opus;
        manager.update_section(ConfigSection::Logging).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("level = \"debug\""));
        assert!(text.contains("ffprobe_path = \"/x/ffprobe\""));
        // [export] was not rewritten
        assert!(!text.contains("opus"));
    }

    #[test]
    fn ensure_dirs_creates_configured_folders() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("trackswap.toml"));
        let paths = &mut manager.settings_mut().paths;
        paths.output_folder = dir.path().join("out").to_string_lossy().to_string();
        paths.logs_folder = dir.path().join("logs").to_string_lossy().to_string();

        manager.ensure_dirs_exist().unwrap();
        assert!(dir.path().join("out").is_dir());
        assert!(dir.path().join("logs").is_dir());
        assert_eq!(manager.logs_folder(), dir.path().join("logs"));
    }

    #[test]
    fn staging_file_is_renamed_away() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trackswap.toml");

        ConfigManager::new(&path).load_or_create().unwrap();
        assert!(path.is_file());
        assert!(!path.with_extension("toml.tmp").exists());
    }
}
