//! AAC encoder capability detection.

use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

use super::config::ConverterConfig;

/// Name of the encoder bundled with every ffmpeg build.
pub const NATIVE_AAC_ENCODER: &str = "aac";

/// Name of the Fraunhofer encoder, only present in non-free builds.
pub const FDK_AAC_ENCODER: &str = "libfdk_aac";

/// AAC encoders detected on the system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderCapabilities {
    /// Fraunhofer FDK AAC available
    pub libfdk_aac: bool,
}

impl EncoderCapabilities {
    /// Detect available encoders by probing ffmpeg.
    pub async fn detect(config: &ConverterConfig) -> Self {
        let output = Command::new(&config.ffmpeg_path)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(o) if o.status.success() => Self::from_encoder_listing(&String::from_utf8_lossy(&o.stdout)),
            _ => Self::default(),
        }
    }

    /// Parses the output of `ffmpeg -encoders`.
    pub fn from_encoder_listing(listing: &str) -> Self {
        Self {
            libfdk_aac: listing
                .lines()
                .any(|line| line.split_whitespace().nth(1) == Some(FDK_AAC_ENCODER)),
        }
    }

    /// The AAC encoder to transcode with, preferring the higher quality one.
    pub fn aac_encoder(&self) -> &'static str {
        if self.libfdk_aac {
            FDK_AAC_ENCODER
        } else {
            NATIVE_AAC_ENCODER
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Encoders:
 V..... = Video
 ------
 A....D aac                  AAC (Advanced Audio Coding)
 A..... libfdk_aac           Fraunhofer FDK AAC (codec aac)
 A..... libmp3lame           libmp3lame MP3 (MPEG audio layer 3) (codec mp3)
";

    #[test]
    fn test_default_capabilities() {
        let caps = EncoderCapabilities::default();
        assert!(!caps.libfdk_aac);
        assert_eq!(caps.aac_encoder(), "aac");
    }

    #[test]
    fn test_listing_with_fdk() {
        let caps = EncoderCapabilities::from_encoder_listing(LISTING);
        assert!(caps.libfdk_aac);
        assert_eq!(caps.aac_encoder(), "libfdk_aac");
    }

    #[test]
    fn test_listing_without_fdk() {
        let listing = LISTING.replace("libfdk_aac", "libopus");
        let caps = EncoderCapabilities::from_encoder_listing(&listing);
        assert!(!caps.libfdk_aac);
        assert_eq!(caps.aac_encoder(), "aac");
    }

    #[test]
    fn test_description_mention_is_not_an_encoder() {
        let listing = " A..... aac_at   wraps libfdk_aac style output\n";
        assert!(!EncoderCapabilities::from_encoder_listing(listing).libfdk_aac);
    }
}
