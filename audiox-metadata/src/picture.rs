// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The FLAC `PICTURE` metadata block layout, reused verbatim as OGG's
//! `METADATA_BLOCK_PICTURE` comment payload.

use audiox_core::errors::Result;
use audiox_core::io::{Reader, StringEncoding};
use audiox_core::CoverArt;

/// A decoded `PICTURE` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlacPicture {
    pub picture_type: u32,
    pub mime: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    pub color_count: u32,
    pub data: Vec<u8>,
}

impl FlacPicture {
    /// Parses a `PICTURE` block body positioned at its `type` field.
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        let picture_type = reader.read_u32be()?;
        let mime_len = reader.read_u32be()? as usize;
        let mime = reader.string(mime_len, StringEncoding::Ascii)?;
        let desc_len = reader.read_u32be()? as usize;
        let description = reader.string(desc_len, StringEncoding::Utf8)?;
        let width = reader.read_u32be()?;
        let height = reader.read_u32be()?;
        let color_depth = reader.read_u32be()?;
        let color_count = reader.read_u32be()?;
        let picture_len = reader.read_u32be()? as usize;
        let data = reader.read_bytes(picture_len)?.unwrap_or_default();

        Ok(FlacPicture { picture_type, mime, description, width, height, color_depth, color_count, data })
    }

    pub fn to_cover_art(&self) -> CoverArt {
        CoverArt { data: self.data.clone(), mime_type: self.mime.clone(), description: self.description.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_reader() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3u32.to_be_bytes()); // front cover
        bytes.extend_from_slice(&9u32.to_be_bytes());
        bytes.extend_from_slice(b"image/png");
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&100u32.to_be_bytes());
        bytes.extend_from_slice(&100u32.to_be_bytes());
        bytes.extend_from_slice(&24u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 4]);

        let mut reader = Reader::from_buffer(bytes.into());
        let picture = FlacPicture::parse(&mut reader).unwrap();
        assert_eq!(picture.mime, "image/png");
        assert_eq!(picture.width, 100);
        assert_eq!(picture.data, vec![1, 2, 3, 4]);
    }
}
