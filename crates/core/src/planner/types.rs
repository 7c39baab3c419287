use serde::Serialize;
use std::fmt;

/// How intermediates are produced from the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// All inputs share a container-safe codec; stream copy.
    Remux,
    /// All inputs share a codec that must be re-encoded.
    TranscodeUniform,
    /// Inputs disagree on codec, rate or channels.
    TranscodeMixed,
}

impl ProcessingMode {
    pub fn is_transcode(&self) -> bool {
        !matches!(self, Self::Remux)
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Remux => "remux",
            Self::TranscodeUniform => "transcode (uniform)",
            Self::TranscodeMixed => "transcode (mixed)",
        };
        f.write_str(s)
    }
}

/// The codec every intermediate must conform to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetCodec {
    pub codec_name: String,
    /// Hz.
    pub sample_rate: u32,
    /// Bits per second.
    pub bit_rate: u32,
    pub channels: u32,
}

impl fmt::Display for TargetCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Hz {} ch {} kb/s",
            self.codec_name,
            self.sample_rate,
            self.channels,
            self.bit_rate / 1000
        )
    }
}
