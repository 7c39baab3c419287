//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, OnceCell};
use tokio::time::timeout;
use tracing::debug;

use super::capabilities::EncoderCapabilities;
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::traits::Converter;
use super::types::{ConversionJob, ConversionProgress, ConversionResult, ProbeOutput};

static OUT_TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^out_time_ms=(\d+)").unwrap());
static SPEED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^speed=\s*(\d+\.?\d*)x").unwrap());

/// Output extensions that are written as MP4 containers.
const MP4_EXTENSIONS: &[&str] = &["m4a", "m4b"];

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
    capabilities: OnceCell<EncoderCapabilities>,
}

/// Running state while reading `-progress` output.
#[derive(Debug, Default)]
struct ProgressState {
    time_secs: f64,
    speed: Option<String>,
}

impl ProgressState {
    /// Applies one `key=value` line, returns true when the time advanced.
    fn apply(&mut self, line: &str) -> bool {
        if let Some(caps) = OUT_TIME_RE.captures(line) {
            if let Some(Ok(us)) = caps.get(1).map(|m| m.as_str().parse::<f64>()) {
                // out_time_ms is reported in microseconds despite its name
                let secs = us / 1_000_000.0;
                if secs > self.time_secs {
                    self.time_secs = secs;
                    return true;
                }
            }
        } else if let Some(caps) = SPEED_RE.captures(line) {
            self.speed = caps.get(1).map(|m| format!("{}x", m.as_str()));
        }
        false
    }

    fn percent(&self, duration_secs: Option<f64>) -> f32 {
        match duration_secs {
            Some(dur) if dur > 0.0 => (self.time_secs / dur * 100.0).min(100.0) as f32,
            _ => 0.0,
        }
    }
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            capabilities: OnceCell::new(),
        }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    /// Builds the full ffmpeg argument list for a job.
    fn build_args(&self, job: &ConversionJob) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-y".to_string(), // Overwrite checks happen before planning
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
        ];

        for input in &job.inputs {
            args.extend(["-i".to_string(), input.to_ffmpeg_arg()]);
        }

        args.extend(job.args.iter().cloned());
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        let is_mp4 = job
            .output_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| MP4_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_mp4 {
            args.extend([
                "-movflags".to_string(),
                "+faststart".to_string(),
                "-f".to_string(),
                "mp4".to_string(),
            ]);
        }

        args.push(job.output_path.to_string_lossy().to_string());
        args
    }

    /// Runs the conversion with optional progress reporting.
    async fn run_conversion(
        &self,
        job: &ConversionJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> Result<ConversionResult, ConverterError> {
        let start = Instant::now();

        for path in job.inputs.iter().flat_map(|input| input.paths()) {
            if !path.exists() {
                return Err(ConverterError::InputNotFound { path: path.clone() });
            }
        }

        let args = self.build_args(job);
        debug!(job_id = %job.job_id, "Running {} {}", self.config.ffmpeg_path.display(), args.join(" "));

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConverterError::conversion_failed("stdout was not captured", None))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConverterError::conversion_failed("stderr was not captured", None))?;

        // Drain diagnostics concurrently so a chatty ffmpeg never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let duration_secs = job.duration_secs;
        let timeout_duration = self.config.timeout();

        let result = timeout(timeout_duration, async {
            let mut state = ProgressState::default();
            while let Some(line) = lines.next_line().await? {
                if state.apply(line.trim()) {
                    if let Some(ref tx) = progress_tx {
                        let _ = tx.try_send(ConversionProgress {
                            job_id: job.job_id.clone(),
                            percent: state.percent(duration_secs),
                            time_secs: state.time_secs,
                            duration_secs,
                            speed: state.speed.clone(),
                        });
                    }
                }
            }
            child.wait().await
        })
        .await;

        let status = match result {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(ConverterError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        let error_output = stderr_task.await.unwrap_or_default();
        if !status.success() {
            let stderr = error_output.trim();
            return Err(ConverterError::conversion_failed(
                format!("FFmpeg exited with code: {:?}", status.code()),
                if stderr.is_empty() {
                    None
                } else {
                    Some(stderr.to_string())
                },
            ));
        }

        let output_meta = tokio::fs::metadata(&job.output_path)
            .await
            .map_err(|_| ConverterError::conversion_failed("Output file not created", None))?;

        Ok(ConversionResult {
            job_id: job.job_id.clone(),
            output_path: job.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn check_binary(&self, path: &Path) -> Result<(), std::io::Error> {
        Command::new(path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<ProbeOutput, ConverterError> {
        if !path.exists() {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-hide_banner",
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "{} ({})",
                String::from_utf8_lossy(&output.stderr).trim(),
                output.status
            )));
        }

        ProbeOutput::from_json(&String::from_utf8_lossy(&output.stdout))
    }

    async fn convert(&self, job: ConversionJob) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(&job, None).await
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> Result<ConversionResult, ConverterError> {
        self.run_conversion(&job, Some(progress_tx)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Err(e) = self.check_binary(&self.config.ffmpeg_path).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        if let Err(e) = self.check_binary(&self.config.ffprobe_path).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        Ok(())
    }

    async fn capabilities(&self) -> EncoderCapabilities {
        self.capabilities
            .get_or_init(|| EncoderCapabilities::detect(&self.config))
            .await
            .clone()
    }
}
