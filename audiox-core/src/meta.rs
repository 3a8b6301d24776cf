// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`AudioMetadata`]: the sparse, format-independent metadata record every demuxer populates and
//! the model format-specific readers (ID3v1/v2, Vorbis comment) map their fields onto.

use std::collections::HashMap;

/// ReplayGain values as stored in MP3 (APEv2/LAME-style), Vorbis comment, and FLAC tags.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplayGain {
    pub track_gain: Option<f32>,
    pub track_peak: Option<f32>,
    pub album_gain: Option<f32>,
    pub album_peak: Option<f32>,
}

/// An embedded picture (ID3v2 `APIC`, FLAC `PICTURE` block, or similar).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverArt {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub description: String,
}

/// Format-independent, sparse metadata record. Every field is optional: demuxers only populate
/// what the source container actually carries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub track_number: Option<u32>,
    pub track_total: Option<u32>,
    pub disc_number: Option<u32>,
    pub disc_total: Option<u32>,
    pub comment: Option<String>,
    pub lyrics: Option<String>,
    pub copyright: Option<String>,
    pub encoded_by: Option<String>,
    pub encoder: Option<String>,
    pub date: Option<String>,
    pub isrc: Option<String>,
    pub bpm: Option<f32>,
    pub replay_gain: Option<ReplayGain>,
    pub cover_art: Vec<CoverArt>,
    pub custom: HashMap<String, String>,
}

impl AudioMetadata {
    pub fn new() -> Self {
        AudioMetadata::default()
    }

    /// Merges `other` into `self`, keeping `self`'s value wherever both sides set the same field.
    /// Used to combine a higher-priority tag source (e.g. ID3v2) with a fallback (ID3v1).
    pub fn merge_fallback(mut self, other: AudioMetadata) -> Self {
        macro_rules! fallback {
            ($field:ident) => {
                if self.$field.is_none() {
                    self.$field = other.$field;
                }
            };
        }
        fallback!(title);
        fallback!(artist);
        fallback!(album);
        fallback!(album_artist);
        fallback!(composer);
        fallback!(genre);
        fallback!(year);
        fallback!(track_number);
        fallback!(track_total);
        fallback!(disc_number);
        fallback!(disc_total);
        fallback!(comment);
        fallback!(lyrics);
        fallback!(copyright);
        fallback!(encoded_by);
        fallback!(encoder);
        fallback!(date);
        fallback!(isrc);
        fallback!(bpm);
        fallback!(replay_gain);
        if self.cover_art.is_empty() {
            self.cover_art = other.cover_art;
        }
        for (k, v) in other.custom {
            self.custom.entry(k).or_insert(v);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_fallback_prefers_self() {
        let primary = AudioMetadata { title: Some("Hi".into()), ..Default::default() };
        let fallback = AudioMetadata {
            title: Some("Lo".into()),
            artist: Some("Only in fallback".into()),
            ..Default::default()
        };
        let merged = primary.merge_fallback(fallback);
        assert_eq!(merged.title.as_deref(), Some("Hi"));
        assert_eq!(merged.artist.as_deref(), Some("Only in fallback"));
    }
}
