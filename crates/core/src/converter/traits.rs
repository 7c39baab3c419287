//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::capabilities::EncoderCapabilities;
use super::error::ConverterError;
use super::types::{ConversionJob, ConversionProgress, ConversionResult, ProbeOutput};

/// The external media tool, seen as a black box.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Probes a media file for its streams and container tags.
    async fn probe(&self, path: &Path) -> Result<ProbeOutput, ConverterError>;

    /// Runs one conversion to completion.
    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError>;

    /// Runs one conversion with progress reporting.
    ///
    /// Progress is best effort: a full or closed channel never affects the
    /// conversion itself.
    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;

    /// Reports which AAC encoders the tool offers.
    async fn capabilities(&self) -> EncoderCapabilities;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::types::ConversionInput;
    use std::path::PathBuf;

    struct NullConverter;

    #[async_trait]
    impl Converter for NullConverter {
        fn name(&self) -> &str {
            "null"
        }

        async fn probe(&self, _path: &Path) -> Result<ProbeOutput, ConverterError> {
            Ok(ProbeOutput::default())
        }

        async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
            Ok(ConversionResult {
                job_id: job.job_id,
                output_path: job.output_path,
                output_size_bytes: 0,
                duration_ms: 0,
            })
        }

        async fn convert_with_progress(
            &self,
            job: ConversionJob,
            _progress_tx: mpsc::Sender<ConversionProgress>,
        ) -> Result<ConversionResult, ConverterError> {
            self.convert(job).await
        }

        async fn validate(&self) -> Result<(), ConverterError> {
            Ok(())
        }

        async fn capabilities(&self) -> EncoderCapabilities {
            EncoderCapabilities::default()
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let converter: Box<dyn Converter> = Box::new(NullConverter);
        assert_eq!(converter.name(), "null");

        let probe = converter.probe(Path::new("/test/a.mp3")).await.unwrap();
        assert!(probe.streams.is_empty());

        let job = ConversionJob {
            job_id: "test-job".to_string(),
            inputs: vec![ConversionInput::File(PathBuf::from("/test/a.mp3"))],
            args: vec![],
            output_path: PathBuf::from("/test/a.aac"),
            duration_secs: None,
        };
        let result = converter.convert(job).await.unwrap();
        assert_eq!(result.job_id, "test-job");
        assert_eq!(converter.capabilities().await.aac_encoder(), "aac");
    }
}
