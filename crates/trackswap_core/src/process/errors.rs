//! Error types for external process execution.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Error from running an external tool.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The executable could not be started (missing, not executable, ...).
    #[error("Failed to launch '{program}': {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("'{program}' failed with exit code {}: {diagnostic}", display_code(.exit_code))]
    ExecutionFailed {
        program: String,
        exit_code: Option<i32>,
        diagnostic: String,
    },

    /// The process outlived its time limit and was killed.
    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The caller (or a global shutdown) cancelled the run; the process was killed.
    #[error("'{program}' was cancelled")]
    Cancelled { program: String },

    /// Waiting on the process failed.
    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

impl ProcessError {
    pub fn launch_failed(program: impl Into<String>, source: io::Error) -> Self {
        Self::LaunchFailed {
            program: program.into(),
            source,
        }
    }

    pub fn execution_failed(
        program: impl Into<String>,
        exit_code: Option<i32>,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self::ExecutionFailed {
            program: program.into(),
            exit_code,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn timeout(program: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            program: program.into(),
            timeout,
        }
    }

    pub fn cancelled(program: impl Into<String>) -> Self {
        Self::Cancelled {
            program: program.into(),
        }
    }

    pub fn io(program: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            program: program.into(),
            source,
        }
    }

    /// Whether this error is the result of a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for process execution.
pub type ProcessResult<T> = Result<T, ProcessError>;
