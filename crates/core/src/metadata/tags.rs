//! Tag record with alias reconciliation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ffmetadata::escape;
use super::filename::escape_filename;

/// Known tag fields, in the order they are written to the tag block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagField {
    Album,
    Artist,
    AlbumArtist,
    Composer,
    Date,
    Disc,
    Genre,
    Title,
    Track,
    Series,
    SeriesPart,
    MovementName,
    Movement,
    NarratedBy,
    Subtitle,
    Comment,
    Grouping,
}

impl TagField {
    /// All fields in emission order.
    pub const ALL: [TagField; 17] = [
        Self::Album,
        Self::Artist,
        Self::AlbumArtist,
        Self::Composer,
        Self::Date,
        Self::Disc,
        Self::Genre,
        Self::Title,
        Self::Track,
        Self::Series,
        Self::SeriesPart,
        Self::MovementName,
        Self::Movement,
        Self::NarratedBy,
        Self::Subtitle,
        Self::Comment,
        Self::Grouping,
    ];

    /// Key written to the metadata file.
    pub fn canonical_key(&self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Artist => "artist",
            Self::AlbumArtist => "album_artist",
            Self::Composer => "composer",
            Self::Date => "date",
            Self::Disc => "disc",
            Self::Genre => "genre",
            Self::Title => "title",
            Self::Track => "track",
            Self::Series => "SERIES",
            Self::SeriesPart => "SERIES-PART",
            Self::MovementName => "MOVEMENTNAME",
            Self::Movement => "MOVEMENT",
            Self::NarratedBy => "NARRATEDBY",
            Self::Subtitle => "TIT3",
            Self::Comment => "comment",
            Self::Grouping => "grouping",
        }
    }

    /// Lowercase spellings accepted when reading, highest precedence first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Album => &["album"],
            Self::Artist => &["artist"],
            Self::AlbumArtist => &["album_artist", "album artist", "albumartist"],
            Self::Composer => &["composer"],
            Self::Date => &["date", "year"],
            Self::Disc => &["disc", "discnumber"],
            Self::Genre => &["genre"],
            Self::Title => &["title"],
            Self::Track => &["track", "tracknumber"],
            Self::Series => &["series"],
            Self::SeriesPart => &["series-part", "series_part"],
            Self::MovementName => &["movementname", "movement_name"],
            Self::Movement => &["movement"],
            Self::NarratedBy => &["narratedby", "narrated_by"],
            Self::Subtitle => &["tit3", "subtitle"],
            Self::Comment => &["comment"],
            Self::Grouping => &["grouping"],
        }
    }
}

/// Tag metadata of one file. Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub composer: String,
    pub date: String,
    pub disc: String,
    pub genre: String,
    pub track: String,
    pub series: String,
    pub series_part: String,
    pub movement_name: String,
    pub movement: String,
    pub subtitle: String,
    pub narrated_by: String,
    pub comment: String,
    pub grouping: String,
}

impl TagMetadata {
    /// Builds a reconciled record from a container tag map.
    ///
    /// Keys are matched case-insensitively against each field's aliases;
    /// unknown keys are ignored.
    pub fn from_tags(tags: &HashMap<String, String>) -> Self {
        let lowered: HashMap<String, &str> = tags
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.as_str()))
            .collect();

        let mut metadata = Self::default();
        for field in TagField::ALL {
            let value = field
                .aliases()
                .iter()
                .filter_map(|alias| lowered.get(*alias))
                .find(|v| !v.is_empty());
            if let Some(value) = value {
                *metadata.field_mut(field) = (*value).to_string();
            }
        }

        metadata.reconcile();
        metadata
    }

    /// Returns the value of a field.
    pub fn get(&self, field: TagField) -> &str {
        match field {
            TagField::Album => &self.album,
            TagField::Artist => &self.artist,
            TagField::AlbumArtist => &self.album_artist,
            TagField::Composer => &self.composer,
            TagField::Date => &self.date,
            TagField::Disc => &self.disc,
            TagField::Genre => &self.genre,
            TagField::Title => &self.title,
            TagField::Track => &self.track,
            TagField::Series => &self.series,
            TagField::SeriesPart => &self.series_part,
            TagField::MovementName => &self.movement_name,
            TagField::Movement => &self.movement,
            TagField::NarratedBy => &self.narrated_by,
            TagField::Subtitle => &self.subtitle,
            TagField::Comment => &self.comment,
            TagField::Grouping => &self.grouping,
        }
    }

    fn field_mut(&mut self, field: TagField) -> &mut String {
        match field {
            TagField::Album => &mut self.album,
            TagField::Artist => &mut self.artist,
            TagField::AlbumArtist => &mut self.album_artist,
            TagField::Composer => &mut self.composer,
            TagField::Date => &mut self.date,
            TagField::Disc => &mut self.disc,
            TagField::Genre => &mut self.genre,
            TagField::Title => &mut self.title,
            TagField::Track => &mut self.track,
            TagField::Series => &mut self.series,
            TagField::SeriesPart => &mut self.series_part,
            TagField::MovementName => &mut self.movement_name,
            TagField::Movement => &mut self.movement,
            TagField::NarratedBy => &mut self.narrated_by,
            TagField::Subtitle => &mut self.subtitle,
            TagField::Comment => &mut self.comment,
            TagField::Grouping => &mut self.grouping,
        }
    }

    /// Synchronizes aliased fields. Idempotent.
    pub fn reconcile(&mut self) {
        sync_pair(&mut self.series, &mut self.movement_name);
        sync_pair(&mut self.series_part, &mut self.movement);

        if self.grouping.is_empty() && !self.series.is_empty() && !self.series_part.is_empty() {
            self.grouping = format!("{} #{}", self.series, self.series_part);
        }

        if !self.artist.is_empty() && self.album_artist.is_empty() {
            self.album_artist = self.artist.clone();
        }
    }

    /// Title the merged file carries: the album if known.
    pub fn effective_title(&self) -> &str {
        if self.album.is_empty() {
            &self.title
        } else {
            &self.album
        }
    }

    /// Renders the global tag lines for the merged, single-track output.
    pub fn to_tag_block(&self) -> String {
        let mut merged = self.clone();
        merged.title = self.effective_title().to_string();
        merged.track = "1".to_string();
        merged.disc = "1".to_string();

        TagField::ALL
            .iter()
            .filter(|field| !merged.get(**field).is_empty())
            .map(|field| format!("{}={}\n", field.canonical_key(), escape(merged.get(*field))))
            .collect()
    }

    /// File name stem for the merged output, `artist - [grouping -] album`.
    ///
    /// Falls back to `{fallback_stem}_merged` when neither artist nor album is
    /// known.
    pub fn output_filename_stem(&self, fallback_stem: &str) -> String {
        if self.artist.is_empty() && self.album.is_empty() {
            return format!("{}_merged", fallback_stem);
        }

        let mut parts = Vec::with_capacity(3);
        if !self.artist.is_empty() {
            parts.push(self.artist.as_str());
        }
        if !self.grouping.is_empty() && !self.album.contains(&self.grouping) {
            parts.push(self.grouping.as_str());
        }
        if !self.album.is_empty() {
            parts.push(self.album.as_str());
        }
        escape_filename(&parts.join(" - "))
    }
}

// Whichever side is populated wins.
fn sync_pair(a: &mut String, b: &mut String) {
    if !a.is_empty() && b.is_empty() {
        *b = a.clone();
    } else if !b.is_empty() && a.is_empty() {
        *a = b.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_series_propagates_to_movement_fields() {
        let metadata = TagMetadata::from_tags(&tags(&[("SERIES", "Foo"), ("SERIES-PART", "1")]));
        assert_eq!(metadata.movement_name, "Foo");
        assert_eq!(metadata.movement, "1");
        assert_eq!(metadata.grouping, "Foo #1");
    }

    #[test]
    fn test_movement_fields_propagate_to_series() {
        let metadata =
            TagMetadata::from_tags(&tags(&[("MOVEMENTNAME", "Saga"), ("movement", "3")]));
        assert_eq!(metadata.series, "Saga");
        assert_eq!(metadata.series_part, "3");
        assert_eq!(metadata.grouping, "Saga #3");
    }

    #[test]
    fn test_existing_grouping_is_kept() {
        let metadata = TagMetadata::from_tags(&tags(&[
            ("series", "Foo"),
            ("series-part", "2"),
            ("grouping", "Custom"),
        ]));
        assert_eq!(metadata.grouping, "Custom");
    }

    #[test]
    fn test_artist_fills_album_artist() {
        let metadata = TagMetadata::from_tags(&tags(&[("artist", "Author")]));
        assert_eq!(metadata.album_artist, "Author");

        let metadata =
            TagMetadata::from_tags(&tags(&[("artist", "Author"), ("album_artist", "Other")]));
        assert_eq!(metadata.album_artist, "Other");
    }

    #[test]
    fn test_subtitle_aliases() {
        let metadata = TagMetadata::from_tags(&tags(&[("SUBTITLE", "A Tale")]));
        assert_eq!(metadata.subtitle, "A Tale");

        let metadata = TagMetadata::from_tags(&tags(&[("TIT3", "First"), ("subtitle", "Second")]));
        assert_eq!(metadata.subtitle, "First");
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let metadata = TagMetadata::from_tags(&tags(&[("encoder", "Lavf60"), ("foo", "bar")]));
        assert_eq!(metadata, TagMetadata::default());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut metadata = TagMetadata::from_tags(&tags(&[
            ("artist", "A"),
            ("series", "S"),
            ("movement", "4"),
        ]));
        let once = metadata.clone();
        metadata.reconcile();
        assert_eq!(metadata, once);
    }

    #[test]
    fn test_tag_block_forces_single_track() {
        let metadata = TagMetadata::from_tags(&tags(&[
            ("title", "Chapter 1"),
            ("album", "The Book"),
            ("artist", "Author"),
            ("track", "7/20"),
            ("SERIES", "Foo"),
            ("SERIES-PART", "1"),
        ]));

        let block = metadata.to_tag_block();
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(
            lines,
            vec![
                "album=The Book",
                "artist=Author",
                "album_artist=Author",
                "disc=1",
                "title=The Book",
                "track=1",
                "SERIES=Foo",
                "SERIES-PART=1",
                "MOVEMENTNAME=Foo",
                "MOVEMENT=1",
                "grouping=Foo \\#1",
            ]
        );
    }

    #[test]
    fn test_tag_block_title_falls_back_to_title() {
        let metadata = TagMetadata::from_tags(&tags(&[("title", "Only Title")]));
        assert!(metadata.to_tag_block().contains("title=Only Title\n"));
    }

    #[test]
    fn test_tag_block_escapes_values() {
        let metadata = TagMetadata::from_tags(&tags(&[("comment", "a=b;c#d\\e\nf")]));
        assert!(metadata
            .to_tag_block()
            .contains("comment=a\\=b\\;c\\#d\\\\e\\\nf\n"));
    }

    #[test]
    fn test_output_stem() {
        let metadata = TagMetadata::from_tags(&tags(&[
            ("artist", "Author"),
            ("album", "The Book"),
            ("series", "Saga"),
            ("series-part", "2"),
        ]));
        assert_eq!(metadata.output_filename_stem("part1"), "Author - Saga #2 - The Book");
    }

    #[test]
    fn test_output_stem_skips_grouping_contained_in_album() {
        let metadata = TagMetadata::from_tags(&tags(&[
            ("artist", "Author"),
            ("album", "Saga #2: The Book"),
            ("series", "Saga"),
            ("series-part", "2"),
        ]));
        assert_eq!(
            metadata.output_filename_stem("part1"),
            "Author - Saga #2- The Book"
        );
    }

    #[test]
    fn test_output_stem_fallback() {
        assert_eq!(
            TagMetadata::default().output_filename_stem("part1"),
            "part1_merged"
        );
    }
}
