//! Remux command synthesis.
//!
//! Translates an [`ExportSettings`](crate::models::ExportSettings) plus the
//! input/output paths into an ffmpeg argument list. Pure: nothing here
//! touches the filesystem or launches a process.
//!
//! # Usage
//!
//! ```ignore
//! use trackswap_core::mux::{RemuxCommandBuilder, RemuxRequest};
//!
//! let request = RemuxRequest::new(video, audio, output, settings)
//!     .with_video_duration(Some(120.0));
//! let args = RemuxCommandBuilder::new(&request).build()?;
//! ```

mod options_builder;
mod types;

pub use options_builder::{
    check_settings, format_tokens_pretty, needs_duration, RemuxCommandBuilder,
};
pub use types::{MuxError, MuxResult, RemuxRequest};
