//! Settings of the ffmpeg/ffprobe pair.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// `[converter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// ffmpeg executable, looked up on `PATH` unless absolute.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable, looked up on `PATH` unless absolute.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Upper bound for one ffmpeg run. The final merge of a long book is a
    /// single run, so this is generous.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Value of ffmpeg's `-loglevel`; stderr at this level is what failures
    /// report.
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Appended to every ffmpeg command line before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_timeout_secs() -> u64 {
    6 * 60 * 60
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_timeout_secs(),
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
        }
    }
}

impl ConverterConfig {
    /// Per-invocation time limit.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
