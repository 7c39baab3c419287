//! Intermediate lifecycle: one conformed artifact per input file.
//!
//! Arguments are chosen once per batch ([`ConversionPlan`]), then each input
//! is converted in order. Every output path is handed to the
//! [`ArtifactScope`] before its conversion starts, so the scope can clean up
//! after a failure at any point.

use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::artifacts::ArtifactScope;
use crate::classifier::ClassifiedFile;
use crate::converter::{
    ConversionInput, ConversionJob, ConversionProgress, Converter, EncoderCapabilities,
    FDK_AAC_ENCODER, NATIVE_AAC_ENCODER,
};
use crate::error::MergeError;
use crate::planner::{MergeBatch, ProcessingMode, TargetCodec};

/// Infix marking intermediate files, `<position>-<stem>.intermed.<ext>`.
const INTERMEDIATE_INFIX: &str = "intermed";

/// How every input of a batch is turned into an intermediate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    mode: ProcessingMode,
    target: TargetCodec,
    /// `None` means stream copy.
    encoder: Option<&'static str>,
}

impl ConversionPlan {
    /// Chooses stream copy or re-encoding for the whole batch.
    ///
    /// `avoid_transcode` turns a uniform transcode into a copy. Mixed inputs
    /// cannot be joined without re-encoding, so the flag is ignored there.
    pub fn for_batch(
        batch: &MergeBatch,
        capabilities: &EncoderCapabilities,
        avoid_transcode: bool,
    ) -> Self {
        let mode = batch.mode();
        let copy = match mode {
            ProcessingMode::Remux => true,
            ProcessingMode::TranscodeUniform => avoid_transcode,
            ProcessingMode::TranscodeMixed => {
                if avoid_transcode {
                    warn!("Inputs differ in codec, sample rate or channels; transcoding anyway");
                }
                false
            }
        };

        let encoder = if copy {
            info!("Remuxing {} file(s)", batch.file_count());
            None
        } else {
            let encoder = capabilities.aac_encoder();
            info!(
                "Transcoding {} file(s) with {} to {}",
                batch.file_count(),
                encoder,
                batch.target()
            );
            Some(encoder)
        };

        Self {
            mode,
            target: batch.target().clone(),
            encoder,
        }
    }

    pub fn is_copy(&self) -> bool {
        self.encoder.is_none()
    }

    pub fn encoder(&self) -> Option<&'static str> {
        self.encoder
    }

    /// Codec arguments for one input.
    pub fn args_for(&self, file: &ClassifiedFile) -> Vec<String> {
        let mut args = vec!["-map".to_string(), format!("0:{}", file.stream.index)];
        match self.encoder {
            None => args.extend(["-c:a".to_string(), "copy".to_string()]),
            Some(encoder) => {
                args.extend([
                    "-c:a".to_string(),
                    encoder.to_string(),
                    "-b:a".to_string(),
                    self.target.bit_rate.to_string(),
                    "-ar".to_string(),
                    self.target.sample_rate.to_string(),
                ]);
                if self.mode == ProcessingMode::TranscodeMixed {
                    args.extend(["-ac".to_string(), self.target.channels.to_string()]);
                }
            }
        }
        args
    }

    /// Extension of the intermediate written for `file`. AAC streams go into
    /// raw ADTS files, which the `concat:` protocol can join byte-wise.
    pub fn intermediate_extension(&self, file: &ClassifiedFile) -> String {
        let produced = match self.encoder {
            Some(_) => NATIVE_AAC_ENCODER,
            None => file.stream.codec_name.as_str(),
        };
        if matches!(produced, NATIVE_AAC_ENCODER | FDK_AAC_ENCODER) {
            return "aac".to_string();
        }
        file.path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| produced.to_string())
    }

    /// Where the intermediate for the `position`-th input (1-based) is
    /// written: next to the source, or in `dir` when given. The position
    /// prefix keeps inputs sharing a stem (`ch1.m4a`, `ch1.mp3`) apart.
    pub fn intermediate_path(
        &self,
        file: &ClassifiedFile,
        position: usize,
        dir: Option<&Path>,
    ) -> PathBuf {
        let name = format!(
            "{:03}-{}.{}.{}",
            position,
            file.file_stem(),
            INTERMEDIATE_INFIX,
            self.intermediate_extension(file)
        );
        match dir {
            Some(dir) => dir.join(name),
            None => file.path.with_file_name(name),
        }
    }
}

/// Converts every input of the batch, in order, one at a time.
///
/// Returns the intermediate paths in batch order. The first failure aborts
/// the loop; the scope still holds every path, including the failed one.
pub async fn generate_intermediates<C: Converter + ?Sized>(
    converter: &C,
    batch: &MergeBatch,
    plan: &ConversionPlan,
    scope: &mut ArtifactScope,
    dir: Option<&Path>,
    progress_tx: Option<&mpsc::Sender<ConversionProgress>>,
) -> Result<Vec<PathBuf>, MergeError> {
    let total = batch.file_count();
    let mut intermediates = Vec::with_capacity(total);

    for (i, file) in batch.files().iter().enumerate() {
        let output_path = plan.intermediate_path(file, i + 1, dir);
        scope.track(&output_path);

        let job = ConversionJob {
            job_id: format!("{}/{} {}", i + 1, total, file_name(&file.path)),
            inputs: vec![ConversionInput::File(file.path.clone())],
            args: plan.args_for(file),
            output_path: output_path.clone(),
            duration_secs: Some(file.stream.duration),
        };

        let result = match progress_tx {
            Some(tx) => converter.convert_with_progress(job, tx.clone()).await,
            None => converter.convert(job).await,
        };
        result.map_err(|e| MergeError::conversion(file.path.display().to_string(), e))?;

        intermediates.push(output_path);
    }

    Ok(intermediates)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
