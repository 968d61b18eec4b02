//! TrackSwap Core - backend logic for swapping a video's audio track.
//!
//! This crate contains all business logic with zero UI dependencies:
//! sync analysis between two audio tracks, ffmpeg remux command synthesis,
//! and the process layer that runs ffmpeg/ffprobe under timeout and
//! cancellation. It can be used by a GUI application or the CLI.

pub mod analysis;
pub mod config;
pub mod export;
pub mod extraction;
pub mod logging;
pub mod models;
pub mod mux;
pub mod process;
pub mod session;

/// Version of this library, as built.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!version().is_empty());
    }
}
