//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while driving the external media tool.
#[derive(Debug, Error)]
pub enum ConverterError {
    #[error("ffmpeg is not runnable at {path}")]
    FfmpegNotFound { path: PathBuf },

    #[error("ffprobe is not runnable at {path}")]
    FfprobeNotFound { path: PathBuf },

    /// An input vanished between planning and conversion.
    #[error("Input file does not exist: {path}")]
    InputNotFound { path: PathBuf },

    /// ffmpeg exited non-zero or produced no output. `stderr` holds its
    /// diagnostics at the configured log level.
    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("ffmpeg killed after running for {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// ffprobe could not read the file at all.
    #[error("ffprobe failed: {reason}")]
    ProbeFailed { reason: String },

    /// ffprobe ran but its output was not understood.
    #[error("Unreadable ffprobe output: {reason}")]
    ParseError { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates a [`ConverterError::ConversionFailed`].
    pub fn conversion_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a [`ConverterError::ProbeFailed`].
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Diagnostic output captured from the tool, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::ConversionFailed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}
