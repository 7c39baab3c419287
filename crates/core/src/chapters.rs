//! Chapter range accumulation.
//!
//! Each input file becomes one chapter. Ranges start at tick 1, each chapter
//! ends `duration_ticks` after it starts, and the next one starts one tick
//! later. MP4 muxers reject overlapping or decreasing chapter marks, so the
//! ranges are built in a single forward pass over the batch order.

use serde::Serialize;

use crate::classifier::ClassifiedFile;

/// One chapter, in ticks of the metadata timebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    pub start: u64,
    pub end: u64,
    pub title: String,
}

/// Chapters of a batch plus the last tick they cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChapterList {
    pub chapters: Vec<Chapter>,
    /// End tick of the last chapter, 0 for an empty list.
    pub total_ticks: u64,
}

/// Walks files in order and assigns contiguous chapter ranges.
pub fn accumulate(files: &[ClassifiedFile]) -> ChapterList {
    accumulate_durations(
        files
            .iter()
            .map(|file| (file.stream.duration_ticks, file.chapter_title())),
    )
}

/// Same as [`accumulate`] for bare `(duration_ticks, title)` pairs.
pub fn accumulate_durations<I>(entries: I) -> ChapterList
where
    I: IntoIterator<Item = (u64, String)>,
{
    let mut chapters = Vec::new();
    let mut cursor = 1u64;
    let mut total_ticks = 0u64;

    for (duration_ticks, title) in entries {
        let start = cursor;
        let end = start + duration_ticks;
        chapters.push(Chapter { start, end, title });
        total_ticks = end;
        cursor = end + 1;
    }

    ChapterList {
        chapters,
        total_ticks,
    }
}
