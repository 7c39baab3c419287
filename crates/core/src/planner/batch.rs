use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::ClassifiedFile;
use crate::config::MergeConfig;
use crate::error::MergeError;

use super::decide::decide;
use super::types::{ProcessingMode, TargetCodec};

/// The filtered, ordered inputs of one merge run and the plan for them.
#[derive(Debug, Clone, Serialize)]
pub struct MergeBatch {
    files: Vec<ClassifiedFile>,
    mode: ProcessingMode,
    target: TargetCodec,
    /// Seconds.
    total_duration: f64,
}

impl MergeBatch {
    /// Drops inputs that look like a previous merge's output, then decides
    /// the processing mode for what remains.
    pub fn new(files: Vec<ClassifiedFile>, config: &MergeConfig) -> Result<Self, MergeError> {
        let files: Vec<ClassifiedFile> = files
            .into_iter()
            .filter(|file| {
                let collides = file.matches_prospective_output();
                if collides {
                    warn!(
                        "Skipping {}: it has the name of the merged output",
                        file.path.display()
                    );
                }
                !collides
            })
            .collect();

        if files.is_empty() {
            return Err(MergeError::EmptyBatch);
        }

        let (mode, target) = decide(&files, config);
        let total_duration = files.iter().map(|f| f.stream.duration).sum();
        info!(
            "Planned {} for {} file(s), target {}",
            mode,
            files.len(),
            target
        );

        Ok(Self {
            files,
            mode,
            target,
            total_duration,
        })
    }

    pub fn files(&self) -> &[ClassifiedFile] {
        &self.files
    }

    /// First surviving input. Output naming and cover extraction follow it.
    pub fn first(&self) -> &ClassifiedFile {
        &self.files[0]
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    pub fn target(&self) -> &TargetCodec {
        &self.target
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::StreamDescriptor;
    use crate::metadata::TagMetadata;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn tagged(path: &str, duration: f64) -> ClassifiedFile {
        let mut tags = HashMap::new();
        tags.insert("artist".to_string(), "Author".to_string());
        tags.insert("album".to_string(), "Book".to_string());
        ClassifiedFile::new(
            PathBuf::from(path),
            StreamDescriptor {
                index: 0,
                codec_name: "aac".to_string(),
                sample_rate: 44100.0,
                bit_rate: 64_000.0,
                channels: 2,
                duration,
                duration_ticks: (duration * 1000.0) as u64,
            },
            TagMetadata::from_tags(&tags),
            None,
        )
    }

    #[test]
    fn test_filters_previous_output() {
        let batch = MergeBatch::new(
            vec![
                tagged("/books/01.m4a", 10.0),
                tagged("/books/Author - Book.m4b", 20.0),
                tagged("/books/02.m4a", 5.5),
            ],
            &MergeConfig::default(),
        )
        .unwrap();

        assert_eq!(batch.file_count(), 2);
        assert_eq!(batch.first().path, PathBuf::from("/books/01.m4a"));
        assert_eq!(batch.files()[1].path, PathBuf::from("/books/02.m4a"));
        assert_eq!(batch.total_duration(), 15.5);
        assert_eq!(batch.mode(), ProcessingMode::Remux);
    }

    #[test]
    fn test_all_filtered_is_empty_batch() {
        let err = MergeBatch::new(
            vec![tagged("/books/Author - Book.m4a", 1.0)],
            &MergeConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::EmptyBatch));

        let err = MergeBatch::new(Vec::new(), &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, MergeError::EmptyBatch));
    }
}
