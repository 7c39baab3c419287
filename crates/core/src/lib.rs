pub mod artifacts;
pub mod chapters;
pub mod classifier;
pub mod config;
pub mod converter;
pub mod error;
pub mod finalizer;
pub mod intermediates;
pub mod merger;
pub mod metadata;
pub mod planner;
pub mod testing;

pub use artifacts::{ArtifactScope, OutputGuard};
pub use chapters::{accumulate, Chapter, ChapterList};
pub use classifier::{classify, codec_equivalent, ClassifiedFile, CodecKey, StreamDescriptor};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, MergeConfig,
};
pub use converter::{Converter, ConverterConfig, ConverterError, FfmpegConverter};
pub use error::MergeError;
pub use merger::{AudiobookMerger, MergeReport, MergeRequest};
pub use metadata::{escape_filename, parse_ffmetadata, TagMetadata};
pub use planner::{decide, MergeBatch, ProcessingMode, TargetCodec};
