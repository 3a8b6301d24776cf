// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Vorbis comment structure, shared by FLAC's `VORBIS_COMMENT` metadata block and the
//! comment header of Vorbis/Opus OGG streams.

use std::collections::HashMap;

use audiox_core::errors::Result;
use audiox_core::io::{Reader, StringEncoding};
use audiox_core::AudioMetadata;

/// `{vendor, comments: key -> [values]}`, as laid out on the wire: a length-prefixed vendor
/// string followed by a count and a run of length-prefixed `"KEY=value"` entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VorbisComment {
    pub vendor: String,
    pub comments: HashMap<String, Vec<String>>,
}

impl VorbisComment {
    /// Reads a Vorbis comment block positioned at its `vendor_len` field.
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        let vendor_len = reader.read_u32le()? as usize;
        let vendor = reader.string(vendor_len, StringEncoding::Utf8)?;

        let n_comments = reader.read_u32le()?;
        let mut comments: HashMap<String, Vec<String>> = HashMap::new();
        for _ in 0..n_comments {
            let len = reader.read_u32le()? as usize;
            let entry = reader.string(len, StringEncoding::Utf8)?;
            if let Some((key, value)) = entry.split_once('=') {
                comments.entry(key.to_ascii_uppercase()).or_default().push(value.to_string());
            }
        }

        Ok(VorbisComment { vendor, comments })
    }

    fn first(&self, key: &str) -> Option<&str> {
        self.comments.get(key).and_then(|values| values.first()).map(String::as_str)
    }

    /// Maps the standard Vorbis comment keys onto the shared metadata record. `DATE` year
    /// parsing takes the leading four characters; a non-numeric prefix yields no year, matching
    /// the historical behaviour of dropping unparseable dates rather than erroring.
    pub fn to_metadata(&self) -> AudioMetadata {
        let mut meta = AudioMetadata::new();
        meta.title = self.first("TITLE").map(String::from);
        meta.artist = self.first("ARTIST").map(String::from);
        meta.album = self.first("ALBUM").map(String::from);
        meta.album_artist = self.first("ALBUMARTIST").map(String::from);
        meta.composer = self.first("COMPOSER").map(String::from);
        meta.genre = self.first("GENRE").map(String::from);
        meta.comment = self.first("COMMENT").or_else(|| self.first("DESCRIPTION")).map(String::from);
        meta.copyright = self.first("COPYRIGHT").map(String::from);
        meta.encoded_by = self.first("ENCODED-BY").map(String::from);
        meta.isrc = self.first("ISRC").map(String::from);
        meta.date = self.first("DATE").map(String::from);
        meta.year = self.first("DATE").and_then(|d| d.get(0..4)).and_then(|s| s.parse().ok());
        meta.bpm = self.first("BPM").and_then(|s| s.parse().ok());

        if let Some(track) = self.first("TRACKNUMBER") {
            let mut parts = track.splitn(2, '/');
            meta.track_number = parts.next().and_then(|s| s.trim().parse().ok());
            meta.track_total = parts.next().and_then(|s| s.trim().parse().ok());
        }
        if let Some(total) = self.first("TRACKTOTAL") {
            meta.track_total = meta.track_total.or_else(|| total.trim().parse().ok());
        }
        if let Some(disc) = self.first("DISCNUMBER") {
            let mut parts = disc.splitn(2, '/');
            meta.disc_number = parts.next().and_then(|s| s.trim().parse().ok());
            meta.disc_total = parts.next().and_then(|s| s.trim().parse().ok());
        }

        for (key, values) in &self.comments {
            if is_standard_key(key) {
                continue;
            }
            if let Some(value) = values.first() {
                meta.custom.insert(key.clone(), value.clone());
            }
        }

        meta
    }
}

fn is_standard_key(key: &str) -> bool {
    matches!(
        key,
        "TITLE"
            | "ARTIST"
            | "ALBUM"
            | "ALBUMARTIST"
            | "COMPOSER"
            | "GENRE"
            | "COMMENT"
            | "DESCRIPTION"
            | "COPYRIGHT"
            | "ENCODED-BY"
            | "ISRC"
            | "DATE"
            | "BPM"
            | "TRACKNUMBER"
            | "TRACKTOTAL"
            | "DISCNUMBER"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(vendor: &str, entries: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        buf.extend_from_slice(vendor.as_bytes());
        buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for entry in entries {
            buf.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            buf.extend_from_slice(entry.as_bytes());
        }
        buf
    }

    #[test]
    fn parses_vendor_and_comments() {
        let bytes = build("audiox", &["TITLE=Hello", "ARTIST=World"]);
        let mut reader = Reader::from_buffer(bytes.into());
        let vc = VorbisComment::parse(&mut reader).unwrap();
        assert_eq!(vc.vendor, "audiox");
        let meta = vc.to_metadata();
        assert_eq!(meta.title.as_deref(), Some("Hello"));
        assert_eq!(meta.artist.as_deref(), Some("World"));
    }

    #[test]
    fn non_numeric_date_prefix_drops_year() {
        let bytes = build("audiox", &["DATE=unknown"]);
        let mut reader = Reader::from_buffer(bytes.into());
        let vc = VorbisComment::parse(&mut reader).unwrap();
        let meta = vc.to_metadata();
        assert_eq!(meta.year, None);
        assert_eq!(meta.date.as_deref(), Some("unknown"));
    }

    #[test]
    fn unknown_keys_become_custom() {
        let bytes = build("audiox", &["X-CUSTOM=value"]);
        let mut reader = Reader::from_buffer(bytes.into());
        let vc = VorbisComment::parse(&mut reader).unwrap();
        let meta = vc.to_metadata();
        assert_eq!(meta.custom.get("X-CUSTOM").map(String::as_str), Some("value"));
    }
}
