//! Errors surfaced by a merge run.

use std::path::PathBuf;
use thiserror::Error;

use crate::converter::ConverterError;

/// Every fatal condition of a merge run. There is no partial success: any of
/// these aborts the whole run after cleanup has happened.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The probe tool could not read the file at all.
    #[error("File {path} could not be probed: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: ConverterError,
    },

    /// The file was read but has no usable audio stream.
    #[error("File {path} contains no usable audio stream")]
    NoAudioStream { path: PathBuf },

    /// A conversion step failed.
    #[error("Conversion failed at {stage}: {source}")]
    Conversion {
        stage: String,
        #[source]
        source: ConverterError,
    },

    /// The output already exists and overwriting was not requested.
    #[error("Target file already exists: {path}")]
    OutputExists { path: PathBuf },

    /// Nothing left to merge after filtering.
    #[error("No input files left to merge")]
    EmptyBatch,

    /// Cover image is not JPEG or PNG.
    #[error("Cover must be a JPEG or PNG file: {path}")]
    InvalidCover { path: PathBuf },

    /// Writing a support file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tool itself is unusable.
    #[error(transparent)]
    Converter(#[from] ConverterError),
}

impl MergeError {
    /// Creates a conversion error for the given stage label.
    pub fn conversion(stage: impl Into<String>, source: ConverterError) -> Self {
        Self::Conversion {
            stage: stage.into(),
            source,
        }
    }

    /// Creates an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Diagnostic output of the failing tool invocation, if captured.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Conversion { source, .. } | Self::Converter(source) => source.diagnostics(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file() {
        let err = MergeError::NoAudioStream {
            path: PathBuf::from("/books/cover.jpg"),
        };
        assert_eq!(
            err.to_string(),
            "File /books/cover.jpg contains no usable audio stream"
        );

        let err = MergeError::OutputExists {
            path: PathBuf::from("/books/Author - Book.m4b"),
        };
        assert!(err.to_string().contains("Author - Book.m4b"));
    }

    #[test]
    fn test_conversion_exposes_diagnostics() {
        let err = MergeError::conversion(
            "part2.mp3",
            ConverterError::conversion_failed("exit 1", Some("Invalid data found".to_string())),
        );
        assert!(err.to_string().starts_with("Conversion failed at part2.mp3"));
        assert_eq!(err.diagnostics(), Some("Invalid data found"));
        assert!(MergeError::EmptyBatch.diagnostics().is_none());
    }
}
