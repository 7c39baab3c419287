//! Reading and writing ffmpeg's plain-text metadata format.
//!
//! ```text
//! ;FFMETADATA1
//! album=The Book
//! artist=Author
//!
//! [CHAPTER]
//! TIMEBASE=1/1000
//! START=1
//! END=61000
//! title=Part 1
//! ```
//!
//! The characters `=`, `;`, `#`, `\` and newline are backslash-escaped in keys
//! and values.

use thiserror::Error;

use super::tags::TagMetadata;
use crate::chapters::Chapter;

/// First line of every metadata file.
pub const HEADER: &str = ";FFMETADATA1";

/// Chapter ticks per second; one tick is a millisecond.
pub const TICKS_PER_SECOND: u64 = 1000;

const CHAPTER_SECTION: &str = "[CHAPTER]";

/// Errors reading a metadata file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FfMetadataError {
    #[error("missing ;FFMETADATA1 header")]
    MissingHeader,

    #[error("malformed line: {0}")]
    MalformedLine(String),

    #[error("invalid chapter: {0}")]
    InvalidChapter(String),
}

/// Backslash-escapes the special characters of the format.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Reverses [`escape`].
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Renders one chapter stanza, preceded by a blank line.
pub fn chapter_stanza(chapter: &Chapter) -> String {
    format!(
        "\n{}\nTIMEBASE=1/{}\nSTART={}\nEND={}\ntitle={}\n",
        CHAPTER_SECTION,
        TICKS_PER_SECOND,
        chapter.start,
        chapter.end,
        escape(&chapter.title)
    )
}

/// Renders a complete metadata file: header, global tags, chapters.
pub fn write_document(tags: &TagMetadata, chapters: &[Chapter]) -> String {
    let mut doc = format!("{}\n", HEADER);
    doc.push_str(&tags.to_tag_block());
    for chapter in chapters {
        doc.push_str(&chapter_stanza(chapter));
    }
    doc
}

/// A chapter as read back from a metadata file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChapter {
    /// Timebase as `(numerator, denominator)`.
    pub timebase: (u64, u64),
    pub start: u64,
    pub end: u64,
    pub title: String,
}

/// Contents of a metadata file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FfMetadataDocument {
    /// Global tags in file order, unescaped.
    pub tags: Vec<(String, String)>,
    pub chapters: Vec<ParsedChapter>,
}

impl FfMetadataDocument {
    /// Looks up a global tag, ignoring key case.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct ChapterBuilder {
    timebase: Option<(u64, u64)>,
    start: Option<u64>,
    end: Option<u64>,
    title: String,
}

impl ChapterBuilder {
    fn build(self) -> Result<ParsedChapter, FfMetadataError> {
        let start = self
            .start
            .ok_or_else(|| FfMetadataError::InvalidChapter("missing START".to_string()))?;
        let end = self
            .end
            .ok_or_else(|| FfMetadataError::InvalidChapter("missing END".to_string()))?;
        Ok(ParsedChapter {
            timebase: self.timebase.unwrap_or((1, 1_000_000_000)),
            start,
            end,
            title: self.title,
        })
    }
}

/// Parses a metadata file.
pub fn parse_ffmetadata(text: &str) -> Result<FfMetadataDocument, FfMetadataError> {
    let lines = logical_lines(text);
    let mut iter = lines.into_iter();
    if iter.next().as_deref() != Some(HEADER) {
        return Err(FfMetadataError::MissingHeader);
    }

    let mut doc = FfMetadataDocument::default();
    let mut chapter: Option<ChapterBuilder> = None;

    for line in iter {
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            if let Some(done) = chapter.take() {
                doc.chapters.push(done.build()?);
            }
            if line == CHAPTER_SECTION {
                chapter = Some(ChapterBuilder::default());
            }
            continue;
        }

        let (key, value) =
            split_key_value(&line).ok_or_else(|| FfMetadataError::MalformedLine(line.clone()))?;

        match chapter.as_mut() {
            Some(builder) => match key.as_str() {
                "TIMEBASE" => builder.timebase = Some(parse_timebase(&value)?),
                "START" => builder.start = Some(parse_tick(&value)?),
                "END" => builder.end = Some(parse_tick(&value)?),
                k if k.eq_ignore_ascii_case("title") => builder.title = value,
                _ => {}
            },
            None => doc.tags.push((key, value)),
        }
    }

    if let Some(done) = chapter {
        doc.chapters.push(done.build()?);
    }
    Ok(doc)
}

// Splits on unescaped newlines, keeping escapes in place.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\n' => lines.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn split_key_value(line: &str) -> Option<(String, String)> {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' {
            return Some((unescape(&line[..idx]), unescape(&line[idx + 1..])));
        }
    }
    None
}

fn parse_tick(value: &str) -> Result<u64, FfMetadataError> {
    value
        .trim()
        .parse()
        .map_err(|_| FfMetadataError::InvalidChapter(format!("bad timestamp {:?}", value)))
}

fn parse_timebase(value: &str) -> Result<(u64, u64), FfMetadataError> {
    let (num, den) = value
        .trim()
        .split_once('/')
        .ok_or_else(|| FfMetadataError::InvalidChapter(format!("bad timebase {:?}", value)))?;
    match (num.parse(), den.parse()) {
        (Ok(n), Ok(d)) if d > 0 => Ok((n, d)),
        _ => Err(FfMetadataError::InvalidChapter(format!(
            "bad timebase {:?}",
            value
        ))),
    }
}
