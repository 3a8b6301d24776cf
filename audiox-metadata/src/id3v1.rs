// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fixed-width, 128-byte ID3v1 trailer.

use audiox_core::AudioMetadata;

/// A parsed ID3v1 (or ID3v1.1, which repurposes two comment bytes for a track number) tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Id3v1Tag {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub comment: String,
    pub track: Option<u8>,
    pub genre: u8,
}

impl Id3v1Tag {
    /// Parses a 128-byte ID3v1 block. Returns `None` if it does not begin with `"TAG"`.
    pub fn parse(block: &[u8]) -> Option<Self> {
        if block.len() != 128 || &block[0..3] != b"TAG" {
            return None;
        }
        let title = latin1_field(&block[3..33]);
        let artist = latin1_field(&block[33..63]);
        let album = latin1_field(&block[63..93]);
        let year = latin1_field(&block[93..97]);
        let comment_field = &block[97..125];
        // ID3v1.1: byte 125 is NUL and byte 126 holds the track number.
        let track = if comment_field[28] == 0 && comment_field[27] != 0 {
            Some(comment_field[27])
        } else {
            None
        };
        let comment = latin1_field(comment_field);
        let genre = block[127];
        Some(Id3v1Tag { title, artist, album, year, comment, track, genre })
    }

    /// Maps this tag's fields onto the shared metadata record. Used as the fallback layer behind
    /// an ID3v2 tag, or standalone when no ID3v2 tag is present.
    pub fn to_metadata(&self) -> AudioMetadata {
        let mut meta = AudioMetadata::new();
        if !self.title.is_empty() {
            meta.title = Some(self.title.clone());
        }
        if !self.artist.is_empty() {
            meta.artist = Some(self.artist.clone());
        }
        if !self.album.is_empty() {
            meta.album = Some(self.album.clone());
        }
        if !self.year.is_empty() {
            meta.year = self.year.parse().ok();
        }
        if !self.comment.is_empty() {
            meta.comment = Some(self.comment.clone());
        }
        meta.track_number = self.track.map(u32::from);
        meta
    }
}

/// Decodes a fixed-width Latin-1 field: trailing NULs and spaces are trimmed.
fn latin1_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end].iter().map(|&b| b as char).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_block() -> Vec<u8> {
        let mut block = vec![0u8; 128];
        block[0..3].copy_from_slice(b"TAG");
        block[3..3 + 5].copy_from_slice(b"Title");
        block[33..33 + 6].copy_from_slice(b"Artist");
        block[93..93 + 4].copy_from_slice(b"2024");
        // ID3v1.1 track number 7 in byte 126 (offset 97+28=125 is comment byte 28).
        block[97 + 27] = 7;
        block[97 + 28] = 0;
        block[127] = 17;
        block
    }

    #[test]
    fn parses_v1_1_track_number() {
        let tag = Id3v1Tag::parse(&make_block()).unwrap();
        assert_eq!(tag.title, "Title");
        assert_eq!(tag.artist, "Artist");
        assert_eq!(tag.year, "2024");
        assert_eq!(tag.track, Some(7));
        assert_eq!(tag.genre, 17);
    }

    #[test]
    fn rejects_missing_magic() {
        let block = vec![0u8; 128];
        assert!(Id3v1Tag::parse(&block).is_none());
    }

    #[test]
    fn to_metadata_parses_year() {
        let tag = Id3v1Tag::parse(&make_block()).unwrap();
        let meta = tag.to_metadata();
        assert_eq!(meta.year, Some(2024));
        assert_eq!(meta.track_number, Some(7));
    }
}
