//! Turns raw probe output into typed per-file descriptors.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::converter::{AudioStreamInfo, ProbeOutput, ProbeStream};
use crate::error::MergeError;
use crate::metadata::ffmetadata::TICKS_PER_SECOND;
use crate::metadata::TagMetadata;

/// Audio facts of one file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDescriptor {
    /// Stream index within the container.
    pub index: usize,
    pub codec_name: String,
    /// Hz.
    pub sample_rate: f64,
    /// Bits per second, 0 when the container does not report it.
    pub bit_rate: f64,
    pub channels: u32,
    /// Seconds.
    pub duration: f64,
    /// Duration in chapter ticks.
    pub duration_ticks: u64,
}

impl StreamDescriptor {
    /// Builds a descriptor from a validated audio stream.
    pub fn from_audio(info: &AudioStreamInfo) -> Self {
        Self {
            index: info.index,
            codec_name: info.codec_name.clone(),
            sample_rate: info.sample_rate,
            bit_rate: info.bit_rate.unwrap_or(0.0),
            channels: info.channels,
            duration: info.duration,
            duration_ticks: (info.duration * TICKS_PER_SECOND as f64).round() as u64,
        }
    }

    /// The fields that decide whether two streams can be joined losslessly.
    pub fn codec_key(&self) -> CodecKey {
        CodecKey {
            codec_name: self.codec_name.clone(),
            sample_rate: self.sample_rate.round() as u32,
            channels: self.channels,
        }
    }
}

/// Grouping key for codec equivalence. Bit-rate is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CodecKey {
    pub codec_name: String,
    pub sample_rate: u32,
    pub channels: u32,
}

/// Same codec name, rounded sample rate and channel count.
pub fn codec_equivalent(a: &StreamDescriptor, b: &StreamDescriptor) -> bool {
    a.codec_key() == b.codec_key()
}

/// An embedded picture stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverStream {
    pub index: usize,
    pub codec_name: Option<String>,
}

impl CoverStream {
    /// Image file extension matching the stream's codec.
    pub fn extension(&self) -> &'static str {
        match self.codec_name.as_deref() {
            Some("png") => "png",
            _ => "jpg",
        }
    }
}

/// A probed input file.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedFile {
    pub path: PathBuf,
    pub stream: StreamDescriptor,
    pub metadata: TagMetadata,
    /// First attached picture, if any.
    pub cover: Option<CoverStream>,
    output_filename_stem: String,
}

impl ClassifiedFile {
    pub fn new(
        path: PathBuf,
        stream: StreamDescriptor,
        metadata: TagMetadata,
        cover: Option<CoverStream>,
    ) -> Self {
        let output_filename_stem = metadata.output_filename_stem(&file_stem(&path));
        Self {
            path,
            stream,
            metadata,
            cover,
            output_filename_stem,
        }
    }

    pub fn has_cover(&self) -> bool {
        self.cover.is_some()
    }

    /// Stem of the merged output this file's tags would produce.
    pub fn output_filename_stem(&self) -> &str {
        &self.output_filename_stem
    }

    /// This file's own stem.
    pub fn file_stem(&self) -> String {
        file_stem(&self.path)
    }

    /// True when the file looks like the output a merge would write, e.g. the
    /// result of a previous run sitting next to its sources.
    pub fn matches_prospective_output(&self) -> bool {
        self.file_stem() == self.output_filename_stem
    }

    /// Chapter title: the track title, else the file stem.
    pub fn chapter_title(&self) -> String {
        if self.metadata.title.is_empty() {
            self.file_stem()
        } else {
            self.metadata.title.clone()
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Classifies one probed file.
///
/// The first usable audio stream is selected; a video stream flagged as an
/// attached picture marks the file as carrying a cover.
pub fn classify(path: &Path, probe: &ProbeOutput) -> Result<ClassifiedFile, MergeError> {
    let mut audio = None;
    let mut cover = None;

    for stream in &probe.streams {
        match stream {
            ProbeStream::Audio(info) if audio.is_none() => audio = Some(info),
            ProbeStream::Video(info) if cover.is_none() && info.is_attached_pic() => {
                cover = Some(CoverStream {
                    index: info.index,
                    codec_name: info.codec_name.clone(),
                });
            }
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| MergeError::NoAudioStream {
        path: path.to_path_buf(),
    })?;

    let stream = StreamDescriptor::from_audio(audio);
    debug!(
        "{}: {} {} Hz {} ch {:.0} b/s {:.1}s cover={}",
        path.display(),
        stream.codec_name,
        stream.sample_rate,
        stream.channels,
        stream.bit_rate,
        stream.duration,
        cover.is_some()
    );

    Ok(ClassifiedFile::new(
        path.to_path_buf(),
        stream,
        TagMetadata::from_tags(&probe.format.tags),
        cover,
    ))
}
