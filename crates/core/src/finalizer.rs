//! The final merge: intermediates + metadata file (+ cover) into one container.

use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::info;

use crate::artifacts::OutputGuard;
use crate::classifier::CoverStream;
use crate::converter::{
    ConversionInput, ConversionJob, ConversionProgress, ConversionResult, Converter,
};
use crate::error::MergeError;

/// Stage label of the merge step in errors and progress events.
pub const MERGE_STAGE: &str = "merge";

/// Stage label of cover extraction.
pub const COVER_STAGE: &str = "cover extraction";

/// Builds the merge invocation.
///
/// Input 0 is the metadata file, input 1 the intermediates read as one
/// concatenated stream, input 2 the optional cover. Audio is stream-copied.
pub fn build_merge_job(
    intermediates: &[PathBuf],
    metadata_file: &Path,
    cover: Option<&Path>,
    output_path: &Path,
    duration_secs: f64,
) -> ConversionJob {
    let mut inputs = vec![
        ConversionInput::File(metadata_file.to_path_buf()),
        ConversionInput::Concat(intermediates.to_vec()),
    ];
    let mut args: Vec<String> = [
        "-map_metadata",
        "0",
        "-map_chapters",
        "0",
        "-map",
        "1:a",
        "-c:a",
        "copy",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if let Some(cover) = cover {
        inputs.push(ConversionInput::File(cover.to_path_buf()));
        args.extend(
            [
                "-map",
                "2:v",
                "-c:v",
                "copy",
                "-disposition:v:0",
                "attached_pic",
                "-metadata:s:v",
                "title=Album cover",
                "-metadata:s:v",
                "comment=Cover (front)",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
    }

    ConversionJob {
        job_id: MERGE_STAGE.to_string(),
        inputs,
        args,
        output_path: output_path.to_path_buf(),
        duration_secs: Some(duration_secs),
    }
}

/// Builds the invocation that copies an embedded picture out of `source`,
/// dropping all tags.
pub fn build_cover_job(source: &Path, cover: &CoverStream, output_path: &Path) -> ConversionJob {
    ConversionJob {
        job_id: COVER_STAGE.to_string(),
        inputs: vec![ConversionInput::File(source.to_path_buf())],
        args: vec![
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-map".to_string(),
            format!("0:{}", cover.index),
            "-c".to_string(),
            "copy".to_string(),
        ],
        output_path: output_path.to_path_buf(),
        duration_secs: None,
    }
}

/// Runs the merge. A failed merge never leaves a file at the output path.
pub async fn finalize<C: Converter + ?Sized>(
    converter: &C,
    job: ConversionJob,
    progress_tx: Option<&mpsc::Sender<ConversionProgress>>,
) -> Result<ConversionResult, MergeError> {
    info!("Merging into {}", job.output_path.display());
    let guard = OutputGuard::new(&job.output_path);

    let result = match progress_tx {
        Some(tx) => converter.convert_with_progress(job, tx.clone()).await,
        None => converter.convert(job).await,
    }
    .map_err(|e| MergeError::conversion(MERGE_STAGE, e))?;

    guard.disarm();
    Ok(result)
}
