//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::converter::{
    ConversionJob, ConversionProgress, ConversionResult, Converter, ConverterError,
    EncoderCapabilities, ProbeOutput,
};

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
    /// Text of every plain-file input readable at call time, by path.
    pub input_texts: HashMap<PathBuf, String>,
}

/// Failure injected on a specific conversion call.
#[derive(Debug, Clone, Copy)]
struct ConvertFailure {
    /// 1-based call number.
    call: usize,
    /// Leave a truncated output behind, like a crashed muxer would.
    write_partial: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Serve canned probe output per path
/// - Track conversion jobs for assertions
/// - Write a small output file for every successful job
/// - Fail a chosen conversion call, optionally after writing partial output
///
/// # Example
///
/// ```rust,ignore
/// use m4bmerge_core::testing::{fixtures, MockConverter};
///
/// let converter = MockConverter::new();
/// converter
///     .set_probe_result("/books/01.m4a", fixtures::audio_probe("aac", 44100.0, 2, 64000.0, 60.0, &[]))
///     .await;
/// converter.fail_on_convert(2, false).await;
///
/// // Hand it to an AudiobookMerger, then:
/// let conversions = converter.recorded_conversions().await;
/// ```
///
/// Clones share state, so a test can keep one handle after passing another
/// to the code under test.
#[derive(Debug, Clone)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// Pre-configured probe results by path.
    probe_results: Arc<RwLock<HashMap<PathBuf, ProbeOutput>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Conversion call that fails.
    convert_failure: Arc<RwLock<Option<ConvertFailure>>>,
    /// Simulated conversion duration in milliseconds.
    conversion_duration_ms: Arc<RwLock<u64>>,
    /// Whether to send progress updates during conversion.
    send_progress: Arc<RwLock<bool>>,
    /// Reported encoder capabilities.
    capabilities: Arc<RwLock<EncoderCapabilities>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            probe_results: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            convert_failure: Arc::new(RwLock::new(None)),
            conversion_duration_ms: Arc::new(RwLock::new(0)),
            send_progress: Arc::new(RwLock::new(true)),
            capabilities: Arc::new(RwLock::new(EncoderCapabilities::default())),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions attempted.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Set a probe result for a specific path.
    pub async fn set_probe_result(&self, path: impl AsRef<Path>, output: ProbeOutput) {
        self.probe_results
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), output);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make the `call`-th conversion (1-based) fail.
    pub async fn fail_on_convert(&self, call: usize, write_partial: bool) {
        *self.convert_failure.write().await = Some(ConvertFailure {
            call,
            write_partial,
        });
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_duration(&self, duration: Duration) {
        *self.conversion_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Enable or disable progress updates during conversion.
    pub async fn set_send_progress(&self, send: bool) {
        *self.send_progress.write().await = send;
    }

    /// Set the reported encoder capabilities.
    pub async fn set_capabilities(&self, capabilities: EncoderCapabilities) {
        *self.capabilities.write().await = capabilities;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    fn snapshot_inputs(job: &ConversionJob) -> HashMap<PathBuf, String> {
        job.inputs
            .iter()
            .flat_map(|input| input.paths())
            .filter_map(|path| {
                std::fs::read_to_string(path)
                    .ok()
                    .map(|text| (path.clone(), text))
            })
            .collect()
    }

    fn check_inputs(job: &ConversionJob) -> Result<(), ConverterError> {
        for path in job.inputs.iter().flat_map(|input| input.paths()) {
            if !path.exists() {
                return Err(ConverterError::InputNotFound { path: path.clone() });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeOutput, ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.probe_results
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| ConverterError::probe_failed(format!("no probe result for {}", path.display())))
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        let call = self.conversions.read().await.len() + 1;
        let input_texts = Self::snapshot_inputs(&job);

        let failure = *self.convert_failure.read().await;
        let injected = match failure {
            Some(failure) if failure.call == call => {
                if failure.write_partial {
                    tokio::fs::write(&job.output_path, b"trunc").await?;
                }
                Some(ConverterError::conversion_failed(
                    format!("ffmpeg exited with status 1 ({})", job.job_id),
                    Some("Invalid data found when processing input".to_string()),
                ))
            }
            _ => self.take_error().await,
        };
        let outcome = match injected {
            Some(err) => Err(err),
            None => Self::check_inputs(&job),
        };

        if let Err(err) = outcome {
            self.conversions.write().await.push(RecordedConversion {
                job,
                success: false,
                input_texts,
            });
            return Err(err);
        }

        // Record the conversion
        self.conversions.write().await.push(RecordedConversion {
            job: job.clone(),
            success: true,
            input_texts,
        });

        // Simulate conversion time; a dropped job leaves the partial output behind
        let duration_ms = *self.conversion_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::fs::write(&job.output_path, b"partial").await?;
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        let content = format!("mock output of {}", job.job_id);
        tokio::fs::write(&job.output_path, content.as_bytes()).await?;

        Ok(ConversionResult {
            job_id: job.job_id,
            output_path: job.output_path,
            output_size_bytes: content.len() as u64,
            duration_ms,
        })
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        if *self.send_progress.read().await {
            let steps = 4;
            let duration = job.duration_secs.unwrap_or(0.0);
            for i in 1..=steps {
                let fraction = i as f64 / steps as f64;
                let _ = progress_tx.try_send(ConversionProgress {
                    job_id: job.job_id.clone(),
                    percent: (fraction * 100.0) as f32,
                    time_secs: duration * fraction,
                    duration_secs: job.duration_secs,
                    speed: Some("10x".to_string()),
                });
            }
        }

        self.convert(job).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }

    async fn capabilities(&self) -> EncoderCapabilities {
        self.capabilities.read().await.clone()
    }
}
