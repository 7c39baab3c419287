//! End-to-end merge orchestration.
//!
//! ```text
//! probe → classify → MergeBatch (filter + decide) → output path check
//!       → intermediates → metadata file (+ cover) → merge → cleanup
//! ```
//!
//! Every file the run creates is owned by one [`ArtifactScope`]. Returning
//! early with an error, or dropping the merge future altogether, releases
//! the scope and removes those files.
//!
//! An analyze-only request stops after the output path check and touches
//! nothing on disk. Moving the originals away happens only once the merged
//! file is complete.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactScope;
use crate::chapters;
use crate::classifier::{classify, ClassifiedFile};
use crate::config::MergeConfig;
use crate::converter::{ConversionProgress, Converter};
use crate::error::MergeError;
use crate::finalizer::{build_cover_job, build_merge_job, finalize, COVER_STAGE};
use crate::intermediates::{generate_intermediates, ConversionPlan};
use crate::metadata::ffmetadata;
use crate::planner::{MergeBatch, ProcessingMode, TargetCodec};

const COVER_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One merge invocation.
#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    /// Input files, in any order.
    pub files: Vec<PathBuf>,
    /// Retain intermediates, the metadata file and any extracted cover.
    pub keep_intermediates: bool,
    /// Stream-copy uniform batches instead of transcoding them.
    pub avoid_transcode: bool,
    /// Explicit cover image, JPEG or PNG.
    pub cover: Option<PathBuf>,
    /// Replace an existing output file.
    pub overwrite: bool,
    /// Plan the merge and report it without converting anything.
    pub analyze_only: bool,
    /// After a successful merge, move the inputs to
    /// `<dir>/<output stem>/`, keeping their layout below their common
    /// parent directory.
    pub move_originals_to: Option<PathBuf>,
}

impl MergeRequest {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }
}

/// Outcome of a successful merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub output_path: PathBuf,
    pub output_size_bytes: u64,
    pub mode: ProcessingMode,
    pub target: TargetCodec,
    /// Inputs merged, after filtering.
    pub files_merged: usize,
    pub chapters: usize,
    /// Seconds.
    pub total_duration: f64,
    /// Support files left on disk because retention was requested.
    pub kept_artifacts: Vec<PathBuf>,
    /// Nothing was converted; `output_path` is where the book would go.
    pub analyzed_only: bool,
    /// New locations of the inputs, when they were moved.
    pub moved_originals: Vec<PathBuf>,
}

/// Merges audio files into one chaptered audiobook.
pub struct AudiobookMerger<C: Converter> {
    converter: Arc<C>,
    config: MergeConfig,
    progress_tx: Option<mpsc::Sender<ConversionProgress>>,
}

impl<C: Converter> AudiobookMerger<C> {
    pub fn new(converter: C, config: MergeConfig) -> Self {
        Self {
            converter: Arc::new(converter),
            config,
            progress_tx: None,
        }
    }

    /// Reports progress of every conversion step on `progress_tx`.
    pub fn with_progress(mut self, progress_tx: mpsc::Sender<ConversionProgress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    /// Runs one merge from probing to cleanup.
    pub async fn merge(&self, request: MergeRequest) -> Result<MergeReport, MergeError> {
        if let Some(cover) = &request.cover {
            validate_cover(cover)?;
        }
        if request.files.is_empty() {
            return Err(MergeError::EmptyBatch);
        }

        self.converter.validate().await?;

        let mut paths = request.files.clone();
        paths.sort();
        paths.dedup();

        let files = self.classify_all(&paths).await?;
        let batch = MergeBatch::new(files, &self.config)?;

        let output_path = self.output_path(&batch, request.avoid_transcode);
        if request.analyze_only {
            if output_path.exists() {
                warn!("Target file already exists: {}", output_path.display());
            }
            return Ok(analysis_report(&batch, output_path));
        }
        if !request.overwrite && output_path.exists() {
            return Err(MergeError::OutputExists { path: output_path });
        }
        info!("Output: {}", output_path.display());

        let capabilities = self.converter.capabilities().await;
        let plan = ConversionPlan::for_batch(&batch, &capabilities, request.avoid_transcode);
        let progress_tx = self.progress_tx.as_ref();

        let mut scope = ArtifactScope::new(request.keep_intermediates);
        let intermediates = generate_intermediates(
            self.converter.as_ref(),
            &batch,
            &plan,
            &mut scope,
            self.config.intermediate_dir.as_deref(),
            progress_tx,
        )
        .await?;

        let chapter_list = chapters::accumulate(batch.files());
        let metadata_path = sibling(&output_path, "ffmetadata.txt");
        scope.track(&metadata_path);
        let document = ffmetadata::write_document(&batch.first().metadata, &chapter_list.chapters);
        tokio::fs::write(&metadata_path, document)
            .await
            .map_err(|e| MergeError::io(&metadata_path, e))?;
        debug!(
            "Wrote {} chapter(s) to {}",
            chapter_list.chapters.len(),
            metadata_path.display()
        );

        let cover = match &request.cover {
            Some(cover) => Some(cover.clone()),
            None => self.extract_cover(batch.first(), &output_path, &mut scope).await?,
        };

        let job = build_merge_job(
            &intermediates,
            &metadata_path,
            cover.as_deref(),
            &output_path,
            batch.total_duration(),
        );
        let result = finalize(self.converter.as_ref(), job, progress_tx).await?;

        let kept_artifacts = if scope.keeps_files() {
            scope.paths().to_vec()
        } else {
            Vec::new()
        };
        let removed = scope.release();
        debug!("Removed {} intermediate file(s)", removed);

        let moved_originals = match &request.move_originals_to {
            Some(target) => move_originals(batch.files(), target, &result.output_path).await?,
            None => Vec::new(),
        };

        info!(
            "Merged {} file(s) into {} ({} chapters)",
            batch.file_count(),
            result.output_path.display(),
            chapter_list.chapters.len()
        );

        Ok(MergeReport {
            output_path: result.output_path,
            output_size_bytes: result.output_size_bytes,
            mode: batch.mode(),
            target: batch.target().clone(),
            files_merged: batch.file_count(),
            chapters: chapter_list.chapters.len(),
            total_duration: batch.total_duration(),
            kept_artifacts,
            analyzed_only: false,
            moved_originals,
        })
    }

    async fn classify_all(&self, paths: &[PathBuf]) -> Result<Vec<ClassifiedFile>, MergeError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let probe = self
                .converter
                .probe(path)
                .await
                .map_err(|source| MergeError::Probe {
                    path: path.clone(),
                    source,
                })?;
            files.push(classify(path, &probe)?);
        }
        Ok(files)
    }

    /// `<first input dir>/<tag derived stem>.<ext>`.
    fn output_path(&self, batch: &MergeBatch, avoid_transcode: bool) -> PathBuf {
        let first = batch.first();
        let source_extension = first
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_string());

        let extension = match (batch.mode(), avoid_transcode, source_extension) {
            (ProcessingMode::TranscodeUniform, true, Some(ext)) => {
                info!("Avoiding transcode, saving as .{}", ext);
                ext
            }
            _ => self.config.output_extension.trim_start_matches('.').to_string(),
        };

        first
            .path
            .with_file_name(format!("{}.{}", first.output_filename_stem(), extension))
    }

    /// Copies the first file's embedded picture out, if it has one.
    async fn extract_cover(
        &self,
        first: &ClassifiedFile,
        output_path: &Path,
        scope: &mut ArtifactScope,
    ) -> Result<Option<PathBuf>, MergeError> {
        let Some(cover) = &first.cover else {
            return Ok(None);
        };

        let cover_path = sibling(output_path, &format!("cover.{}", cover.extension()));
        scope.track(&cover_path);
        info!("Extracting cover from {}", first.path.display());
        self.converter
            .convert(build_cover_job(&first.path, cover, &cover_path))
            .await
            .map_err(|e| MergeError::conversion(COVER_STAGE, e))?;
        Ok(Some(cover_path))
    }
}

fn validate_cover(cover: &Path) -> Result<(), MergeError> {
    let valid = cover
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| COVER_EXTENSIONS.contains(&e.as_str()));
    if valid {
        Ok(())
    } else {
        Err(MergeError::InvalidCover {
            path: cover.to_path_buf(),
        })
    }
}

fn analysis_report(batch: &MergeBatch, output_path: PathBuf) -> MergeReport {
    let chapter_list = chapters::accumulate(batch.files());
    info!(
        "Analysis: {} file(s), {} into {}",
        batch.file_count(),
        batch.mode(),
        output_path.display()
    );
    MergeReport {
        output_path,
        output_size_bytes: 0,
        mode: batch.mode(),
        target: batch.target().clone(),
        files_merged: batch.file_count(),
        chapters: chapter_list.chapters.len(),
        total_duration: batch.total_duration(),
        kept_artifacts: Vec::new(),
        analyzed_only: true,
        moved_originals: Vec::new(),
    }
}

async fn move_originals(
    files: &[ClassifiedFile],
    target: &Path,
    output_path: &Path,
) -> Result<Vec<PathBuf>, MergeError> {
    let subdir = target.join(output_stem(output_path));
    let common = common_parent(files.iter().map(|f| f.path.as_path()));
    info!("Moving original files to {}", subdir.display());

    let mut moved = Vec::with_capacity(files.len());
    for file in files {
        let relative = match file.path.strip_prefix(&common) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => PathBuf::from(file.path.file_name().unwrap_or_default()),
        };
        let destination = subdir.join(relative);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MergeError::io(parent, e))?;
        }
        move_file(&file.path, &destination)
            .await
            .map_err(|e| MergeError::io(&file.path, e))?;
        debug!("Moved {} to {}", file.path.display(), destination.display());
        moved.push(destination);
    }
    Ok(moved)
}

// Falls back to copy + remove when a rename crosses filesystems.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

/// Deepest directory containing every path.
fn common_parent<'a>(paths: impl IntoIterator<Item = &'a Path>) -> PathBuf {
    let mut paths = paths.into_iter();
    let mut common = paths
        .next()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default();
    for path in paths {
        while !path.starts_with(&common) {
            if !common.pop() {
                break;
            }
        }
    }
    common
}

fn output_stem(output_path: &Path) -> String {
    output_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// `<dir>/<output stem>.<suffix>`
fn sibling(output_path: &Path, suffix: &str) -> PathBuf {
    output_path.with_file_name(format!("{}.{}", output_stem(output_path), suffix))
}
