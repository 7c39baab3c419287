use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m4bmerge_core::{
    converter::ConversionProgress, load_config, load_config_or_default, validate_config,
    AudiobookMerger, Config, Converter, FfmpegConverter, MergeError, MergeRequest,
};

/// Buffer size for the progress channel
const PROGRESS_BUFFER_SIZE: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "m4bmerge", version)]
#[command(about = "Merge audio files into a single chaptered audiobook")]
struct Args {
    /// Audio files to merge, one chapter each
    #[arg(required = true, value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Keep intermediate files, the metadata file and any extracted cover
    #[arg(short = 'k', long)]
    keep_intermediates: bool,

    /// Stream-copy inputs that share a codec instead of transcoding them
    #[arg(short = 'n', long = "no-transcode")]
    no_transcode: bool,

    /// Cover image (JPEG or PNG) to embed
    #[arg(short, long, value_name = "PATH")]
    cover: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(short = 'y', long)]
    overwrite: bool,

    /// Only report how the files would be merged
    #[arg(short = 'a', long)]
    analyze_only: bool,

    /// Move the original files below this directory after merging
    #[arg(short = 'm', long, value_name = "DIR", conflicts_with = "analyze_only")]
    move_originals_to: Option<PathBuf>,

    /// Configuration file
    #[arg(long, env = "M4BMERGE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'D', long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        if let Some(stderr) = e.downcast_ref::<MergeError>().and_then(MergeError::diagnostics) {
            error!("ffmpeg output:\n{}", stderr.trim_end());
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load(&args)?;
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Configuration: {:?}", config);

    let converter = FfmpegConverter::new(config.converter.clone());
    info!("Using converter: {}", converter.name());

    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_BUFFER_SIZE);
    let progress_handle = tokio::spawn(log_progress(progress_rx));

    let merger = AudiobookMerger::new(converter, config.merge).with_progress(progress_tx);
    let request = MergeRequest {
        files: args.files,
        keep_intermediates: args.keep_intermediates,
        avoid_transcode: args.no_transcode,
        cover: args.cover,
        overwrite: args.overwrite,
        analyze_only: args.analyze_only,
        move_originals_to: args.move_originals_to,
    };

    // Dropping the merge future on interrupt kills ffmpeg and removes every
    // file the run created.
    let outcome = tokio::select! {
        result = merger.merge(request) => Some(result),
        _ = signal::ctrl_c() => None,
    };
    drop(merger);
    let _ = progress_handle.await;

    let report = match outcome {
        Some(result) => result?,
        None => bail!("Interrupted, partial files removed"),
    };

    if report.analyzed_only {
        info!(
            "Would merge {} file(s) into {} ({} chapters, {}, target {}, {:.0}s)",
            report.files_merged,
            report.output_path.display(),
            report.chapters,
            report.mode,
            report.target,
            report.total_duration
        );
        return Ok(());
    }

    info!(
        "Done: {} ({} chapters, {}, {:.1} MiB)",
        report.output_path.display(),
        report.chapters,
        report.mode,
        report.output_size_bytes as f64 / (1024.0 * 1024.0)
    );
    for path in &report.kept_artifacts {
        info!("Kept {}", path.display());
    }
    if !report.moved_originals.is_empty() {
        info!("Moved {} original file(s)", report.moved_originals.len());
    }
    Ok(())
}

fn load(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => load_config_or_default().context("Failed to load configuration"),
    }
}

async fn log_progress(mut rx: mpsc::Receiver<ConversionProgress>) {
    let mut current_job = String::new();
    let mut last_step = 0u32;

    while let Some(progress) = rx.recv().await {
        if progress.job_id != current_job {
            info!("Processing {}", progress.job_id);
            current_job = progress.job_id.clone();
            last_step = 0;
        }

        // One line per 10% step.
        let step = (progress.percent / 10.0) as u32;
        if step > last_step {
            last_step = step;
            debug!(
                "{}: {:.0}% ({:.0}s, {})",
                progress.job_id,
                progress.percent,
                progress.time_secs,
                progress.speed.as_deref().unwrap_or("?")
            );
        }
    }
}
