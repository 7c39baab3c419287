use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::ConverterConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub merge: MergeConfig,
}

/// Merge planning configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeConfig {
    /// Codecs whose streams may be joined without re-encoding.
    #[serde(default = "default_remux_codecs")]
    pub remux_codecs: Vec<String>,
    /// Lowest transcode bit-rate in bits per second.
    #[serde(default = "default_min_bitrate")]
    pub min_bitrate: u32,
    /// Highest transcode bit-rate in bits per second.
    #[serde(default = "default_max_bitrate")]
    pub max_bitrate: u32,
    /// Extension of the merged audiobook.
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
    /// Where intermediates are written. Next to each source when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediate_dir: Option<PathBuf>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            remux_codecs: default_remux_codecs(),
            min_bitrate: default_min_bitrate(),
            max_bitrate: default_max_bitrate(),
            output_extension: default_output_extension(),
            intermediate_dir: None,
        }
    }
}

impl MergeConfig {
    /// Whether streams of this codec can be concatenated losslessly.
    pub fn allows_remux(&self, codec_name: &str) -> bool {
        self.remux_codecs.iter().any(|c| c == codec_name)
    }
}

fn default_remux_codecs() -> Vec<String> {
    vec!["aac".to_string(), "libfdk_aac".to_string()]
}

fn default_min_bitrate() -> u32 {
    96_000
}

fn default_max_bitrate() -> u32 {
    192_000
}

fn default_output_extension() -> String {
    "m4b".to_string()
}
