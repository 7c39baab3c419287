//! Testing utilities: a scriptable [`Converter`](crate::converter::Converter)
//! and probe fixtures, so the whole merge flow runs without ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use m4bmerge_core::testing::{fixtures, MockConverter};
//!
//! let converter = MockConverter::new();
//! converter
//!     .set_probe_result("/books/01.m4a", fixtures::audio_probe("aac", 44100.0, 2, 64000.0, 60.0, &[]))
//!     .await;
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::converter::{
        AudioStreamInfo, ProbeFormat, ProbeOutput, ProbeStream, StreamDisposition,
        VideoStreamInfo,
    };

    /// Probe output of a file with one audio stream at index 0.
    pub fn audio_probe(
        codec_name: &str,
        sample_rate: f64,
        channels: u32,
        bit_rate: f64,
        duration: f64,
        tags: &[(&str, &str)],
    ) -> ProbeOutput {
        ProbeOutput {
            streams: vec![ProbeStream::Audio(AudioStreamInfo {
                index: 0,
                codec_name: codec_name.to_string(),
                sample_rate,
                bit_rate: Some(bit_rate),
                channels,
                duration,
            })],
            format: ProbeFormat {
                tags: tags
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        }
    }

    /// Adds an attached picture stream after the existing streams.
    pub fn with_cover(mut probe: ProbeOutput, codec_name: &str) -> ProbeOutput {
        probe.streams.push(ProbeStream::Video(VideoStreamInfo {
            index: probe.streams.len(),
            codec_name: Some(codec_name.to_string()),
            disposition: StreamDisposition { attached_pic: 1 },
        }));
        probe
    }

    /// Probe output of a file ffprobe reads but that has no audio.
    pub fn picture_only_probe() -> ProbeOutput {
        with_cover(ProbeOutput::default(), "mjpeg")
    }
}
