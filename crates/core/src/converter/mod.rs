//! Converter module wrapping the external media tool.
//!
//! The rest of the crate treats ffmpeg/ffprobe as a capability with two
//! operations: `probe(file)` returning a stream/format descriptor, and
//! `convert(inputs, args, output)` which streams progress and fails on a bad
//! exit code. Everything behind the [`Converter`] trait is replaceable, which
//! is how the integration tests run without ffmpeg installed.
//!
//! # Example
//!
//! ```ignore
//! use m4bmerge_core::converter::{Converter, ConversionInput, ConversionJob, FfmpegConverter};
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! let probe = converter.probe(Path::new("/books/part1.mp3")).await?;
//! println!("{} streams", probe.streams.len());
//!
//! let job = ConversionJob {
//!     job_id: "part1".to_string(),
//!     inputs: vec![ConversionInput::File(PathBuf::from("/books/part1.mp3"))],
//!     args: vec!["-c:a".into(), "aac".into(), "-b:a".into(), "128000".into()],
//!     output_path: PathBuf::from("/books/part1.intermed.aac"),
//!     duration_secs: Some(1800.0),
//! };
//! converter.convert(job).await?;
//! ```

mod capabilities;
mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use capabilities::{EncoderCapabilities, FDK_AAC_ENCODER, NATIVE_AAC_ENCODER};
pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use traits::Converter;
pub use types::{
    AudioStreamInfo, ConversionInput, ConversionJob, ConversionProgress, ConversionResult,
    ProbeFormat, ProbeOutput, ProbeStream, StreamDisposition, VideoStreamInfo,
};
