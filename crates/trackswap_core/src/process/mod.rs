//! External process execution.
//!
//! # Architecture
//!
//! - [`ProcessRunner`] spawns one tool invocation, drains its output pipes
//!   concurrently and races exit against timeout and cancellation.
//! - [`ProcessRegistry`] tracks every live child so that all of them can be
//!   killed at once on shutdown.
//!
//! # Usage
//!
//! ```ignore
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use trackswap_core::process::{ProcessInvocation, ProcessRunner};
//!
//! let runner = ProcessRunner::default();
//! let invocation = ProcessInvocation::new("ffmpeg")
//!     .args(["-hide_banner", "-version"])
//!     .with_timeout(Duration::from_secs(10));
//! let output = runner.run(&invocation, &CancellationToken::new()).await?;
//! ```

mod errors;
mod registry;
mod runner;

pub use errors::{ProcessError, ProcessResult};
pub use registry::{ProcessInfo, ProcessRegistry, Registration};
pub use runner::{ProcessInvocation, ProcessOutput, ProcessRunner, DEFAULT_TIMEOUT};
