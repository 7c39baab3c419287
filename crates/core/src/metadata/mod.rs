//! Tag metadata, its reconciliation and its serialization.

pub mod ffmetadata;
mod filename;
mod tags;

pub use ffmetadata::{parse_ffmetadata, FfMetadataDocument, FfMetadataError, ParsedChapter};
pub use filename::escape_filename;
pub use tags::{TagField, TagMetadata};
