//! Configuration management for TrackSwap.
//!
//! [`Settings`] is the typed view of the TOML file; [`ConfigManager`]
//! reads it, validates it with [`validate`], and writes it back either whole
//! or one table at a time. All writes are staged in a temp file and renamed.
//!
//! # Example
//!
//! ```no_run
//! use trackswap_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/trackswap.toml");
//! config.load_or_create().unwrap();
//!
//! println!("ffmpeg: {}", config.settings().tools.ffmpeg_path);
//!
//! config.settings_mut().export.auto_fade = false;
//! config.update_section(ConfigSection::Export).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{validate, ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AnalysisSettings, ConfigSection, ExportDefaults, LoggingSettings, PathSettings, Settings,
    ToolSettings,
};
