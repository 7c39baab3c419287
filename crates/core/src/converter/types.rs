//! Types for the converter module.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::error::ConverterError;

/// Raw ffprobe result for one file (`-show_streams -show_format`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProbeOutput {
    /// Elementary streams in container order.
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    /// Container level information.
    #[serde(default)]
    pub format: ProbeFormat,
}

impl ProbeOutput {
    /// Parses ffprobe JSON output.
    ///
    /// Individual malformed streams never fail the parse; they come back as
    /// [`ProbeStream::Unrecognized`].
    pub fn from_json(output: &str) -> Result<Self, ConverterError> {
        serde_json::from_str(output).map_err(|e| ConverterError::ParseError {
            reason: format!("Failed to parse ffprobe output: {}", e),
        })
    }
}

/// Container level section of a probe.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProbeFormat {
    /// Global tags, keys as reported by the container.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// One elementary stream, validated permissively.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStream {
    /// A structurally valid audio stream.
    Audio(AudioStreamInfo),
    /// A video stream (only relevant as a possible cover image).
    Video(VideoStreamInfo),
    /// Anything else, including audio streams missing required fields.
    Unrecognized { codec_type: Option<String> },
}

impl ProbeStream {
    /// Converts a raw JSON stream entry, degrading failures to `Unrecognized`.
    pub fn from_value(value: serde_json::Value) -> Self {
        let codec_type = value
            .get("codec_type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        let parsed = match codec_type.as_deref() {
            Some("audio") => serde_json::from_value::<AudioStreamInfo>(value)
                .ok()
                .filter(AudioStreamInfo::is_usable)
                .map(Self::Audio),
            Some("video") => serde_json::from_value::<VideoStreamInfo>(value)
                .ok()
                .map(Self::Video),
            _ => None,
        };

        parsed.unwrap_or(Self::Unrecognized { codec_type })
    }
}

impl<'de> Deserialize<'de> for ProbeStream {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

/// Fields of an audio stream needed for merge planning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioStreamInfo {
    /// Stream index within the container.
    #[serde(default)]
    pub index: usize,
    pub codec_name: String,
    #[serde(deserialize_with = "de_number")]
    pub sample_rate: f64,
    /// Missing for some lossless codecs.
    #[serde(default, deserialize_with = "de_optional_number")]
    pub bit_rate: Option<f64>,
    pub channels: u32,
    #[serde(deserialize_with = "de_number")]
    pub duration: f64,
}

impl AudioStreamInfo {
    fn is_usable(&self) -> bool {
        !self.codec_name.is_empty()
            && self.sample_rate.is_finite()
            && self.sample_rate > 0.0
            && self.channels > 0
            && self.duration.is_finite()
            && self.duration >= 0.0
    }
}

/// Fields of a video stream needed for cover detection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoStreamInfo {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub disposition: StreamDisposition,
}

impl VideoStreamInfo {
    /// Whether this stream is an embedded picture rather than real video.
    pub fn is_attached_pic(&self) -> bool {
        self.disposition.attached_pic != 0
    }
}

/// Stream disposition flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamDisposition {
    #[serde(default)]
    pub attached_pic: u8,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

// ffprobe reports most numeric stream fields as strings.
fn de_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn de_optional_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::String(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// One input of a conversion invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionInput {
    /// A regular file.
    File(PathBuf),
    /// Several files read back to back as one stream (`concat:` protocol).
    Concat(Vec<PathBuf>),
}

impl ConversionInput {
    /// Returns the value passed to ffmpeg's `-i`.
    pub fn to_ffmpeg_arg(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().to_string(),
            Self::Concat(paths) => {
                let joined: Vec<String> = paths
                    .iter()
                    .map(|p| p.to_string_lossy().to_string())
                    .collect();
                format!("concat:{}", joined.join("|"))
            }
        }
    }

    /// The files on disk this input reads.
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::File(path) => std::slice::from_ref(path),
            Self::Concat(paths) => paths,
        }
    }
}

/// A conversion job request.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Label used in progress events and error messages.
    pub job_id: String,
    /// Ordered inputs, each becomes one `-i`.
    pub inputs: Vec<ConversionInput>,
    /// Codec, mapping and metadata arguments placed after the inputs.
    pub args: Vec<String>,
    /// Output file path.
    pub output_path: PathBuf,
    /// Expected media duration, used to compute progress percentages.
    pub duration_secs: Option<f64>,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Job ID.
    pub job_id: String,
    /// Output file path.
    pub output_path: PathBuf,
    /// Output file size in bytes.
    pub output_size_bytes: u64,
    /// Conversion duration in milliseconds.
    pub duration_ms: u64,
}

/// Progress update during conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Job ID.
    pub job_id: String,
    /// Progress percentage (0.0 - 100.0).
    pub percent: f32,
    /// Processed media time in seconds.
    pub time_secs: f64,
    /// Expected total duration in seconds.
    pub duration_secs: Option<f64>,
    /// Current processing speed (e.g., "1.5x").
    pub speed: Option<String>,
}
