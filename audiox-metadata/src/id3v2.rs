// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ID3v2.2/2.3/2.4 header and frame parsing.

use audiox_core::errors::{invalid_container, Result};
use audiox_core::io::{Reader, StringEncoding};
use audiox_core::{AudioMetadata, CoverArt};

/// One raw ID3v2 frame, before any field-specific decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Id3v2Frame {
    pub id: String,
    pub data: Vec<u8>,
    pub flags: u16,
}

/// A parsed ID3v2 tag: version, header flags, and the frames found before padding or end-of-tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Id3v2Tag {
    pub version: (u8, u8),
    pub flags: u8,
    pub frames: Vec<Id3v2Frame>,
}

impl Id3v2Tag {
    /// Parses the frame stream of a tag whose 10-byte header has already been consumed by the
    /// caller. `tag_size` is the syncsafe size from that header (the frame+padding region only).
    pub fn parse(reader: &mut Reader, major: u8, minor: u8, flags: u8, tag_size: u32) -> Result<Self> {
        let body_start = reader.position();
        let mut remaining = tag_size as u64;

        // Extended header, when present, is skipped: its fields (CRC, restrictions) are not
        // surfaced by this tag model.
        if flags & 0x40 != 0 {
            let ext_size = if major >= 4 {
                reader.syncsafe_int()? as u64
            } else {
                reader.read_u32be()? as u64
            };
            let already_read = reader.position() - body_start;
            let skip_remaining = ext_size.saturating_sub(if major >= 4 { 4 } else { 0 });
            reader.skip(skip_remaining)?;
            remaining = remaining.saturating_sub(already_read + skip_remaining);
        }

        let id_len: usize = if major == 2 { 3 } else { 4 };
        let mut frames = Vec::new();

        while remaining >= id_len as u64 + 1 {
            let id_bytes = match reader.read_bytes(id_len)? {
                Some(bytes) => bytes,
                None => break,
            };
            remaining = remaining.saturating_sub(id_len as u64);

            // A NUL frame-id marks the start of padding.
            if id_bytes[0] == 0 {
                break;
            }
            let id = String::from_utf8_lossy(&id_bytes).into_owned();

            let size = if major == 2 {
                remaining = remaining.saturating_sub(3);
                reader.read_u24be()?
            } else if major == 4 {
                remaining = remaining.saturating_sub(4);
                reader.syncsafe_int()?
            } else {
                remaining = remaining.saturating_sub(4);
                reader.read_u32be()?
            };

            let frame_flags = if major >= 3 {
                remaining = remaining.saturating_sub(2);
                reader.read_u16be()?
            } else {
                0
            };

            let data = reader.read_bytes(size as usize)?.unwrap_or_default();
            remaining = remaining.saturating_sub(data.len() as u64);

            frames.push(Id3v2Frame { id, data, flags: frame_flags });
        }

        // Any unread bytes are padding; leave the reader positioned at the tag's end regardless
        // of how many frames were actually consumed.
        let consumed = reader.position() - body_start;
        if consumed < tag_size as u64 {
            reader.skip(tag_size as u64 - consumed)?;
        }

        Ok(Id3v2Tag { version: (major, minor), flags, frames })
    }

    /// Maps this tag's known frames onto the shared metadata record, per the standard ID3v2
    /// frame-id table (v2.2's three-letter ids are the aliases of their v2.3/2.4 equivalents).
    pub fn to_metadata(&self) -> AudioMetadata {
        let mut meta = AudioMetadata::new();
        for frame in &self.frames {
            apply_frame(&mut meta, frame);
        }
        meta
    }
}

fn apply_frame(meta: &mut AudioMetadata, frame: &Id3v2Frame) {
    match frame.id.as_str() {
        "TIT2" | "TT2" => meta.title = text_value(&frame.data),
        "TPE1" | "TP1" => meta.artist = text_value(&frame.data),
        "TALB" | "TAL" => meta.album = text_value(&frame.data),
        "TPE2" | "TP2" => meta.album_artist = text_value(&frame.data),
        "TCOM" | "TCM" => meta.composer = text_value(&frame.data),
        "TCON" | "TCO" => meta.genre = text_value(&frame.data),
        "TYER" | "TYE" => meta.year = text_value(&frame.data).and_then(|s| s.parse().ok()),
        "TDRC" => {
            let date = text_value(&frame.data);
            meta.year = date.as_deref().and_then(|s| s.get(0..4)).and_then(|s| s.parse().ok());
            meta.date = date;
        }
        "TRCK" | "TRK" => {
            if let Some(text) = text_value(&frame.data) {
                let mut parts = text.splitn(2, '/');
                meta.track_number = parts.next().and_then(|s| s.trim().parse().ok());
                meta.track_total = parts.next().and_then(|s| s.trim().parse().ok());
            }
        }
        "TPOS" | "TPA" => {
            if let Some(text) = text_value(&frame.data) {
                let mut parts = text.splitn(2, '/');
                meta.disc_number = parts.next().and_then(|s| s.trim().parse().ok());
                meta.disc_total = parts.next().and_then(|s| s.trim().parse().ok());
            }
        }
        "COMM" | "COM" => meta.comment = comm_or_uslt_value(&frame.data),
        "USLT" | "ULT" => meta.lyrics = comm_or_uslt_value(&frame.data),
        "TCOP" | "TCR" => meta.copyright = text_value(&frame.data),
        "TENC" | "TEN" => meta.encoded_by = text_value(&frame.data),
        "TSSE" | "TSS" => meta.encoder = text_value(&frame.data),
        "TSRC" | "TRC" => meta.isrc = text_value(&frame.data),
        "TBPM" | "TBP" => meta.bpm = text_value(&frame.data).and_then(|s| s.parse().ok()),
        "APIC" | "PIC" => {
            if let Some(picture) = apic_value(&frame.data, frame.id.len() == 3) {
                meta.cover_art.push(picture);
            }
        }
        "TXXX" | "TXX" => {
            if let Some((key, value)) = txxx_value(&frame.data) {
                meta.custom.insert(key, value);
            }
        }
        _ => {}
    }
}

/// Decodes a text-information frame body: one encoding byte followed by the encoded text.
fn text_value(data: &[u8]) -> Option<String> {
    let (encoding, rest) = data.split_first()?;
    decode_text(*encoding, rest).map(|s| s.trim_end_matches('\0').to_string())
}

/// Decodes a COMM/USLT body: encoding byte, 3-byte language code, short description, NUL, text.
fn comm_or_uslt_value(data: &[u8]) -> Option<String> {
    let (&encoding, rest) = data.split_first()?;
    let rest = rest.get(3..)?; // skip the language code
    let (_short_desc, text) = split_at_text_terminator(encoding, rest)?;
    decode_text(encoding, text).map(|s| s.trim_end_matches('\0').to_string())
}

/// Decodes a TXXX/TXX body: encoding byte, description, NUL, value.
fn txxx_value(data: &[u8]) -> Option<(String, String)> {
    let (&encoding, rest) = data.split_first()?;
    let (desc, value) = split_at_text_terminator(encoding, rest)?;
    let key = decode_text(encoding, desc)?.trim_end_matches('\0').to_string();
    let value = decode_text(encoding, value)?.trim_end_matches('\0').to_string();
    Some((key, value))
}

/// Decodes an APIC/PIC body. `is_v22` selects the 3-byte-extension-string layout of ID3v2.2's
/// `PIC` frame over the MIME-string layout of `APIC`.
fn apic_value(data: &[u8], is_v22: bool) -> Option<CoverArt> {
    let (&encoding, rest) = data.split_first()?;
    let (mime, rest) = if is_v22 {
        if rest.len() < 3 {
            return None;
        }
        rest.split_at(3)
    } else {
        let nul = rest.iter().position(|&b| b == 0)?;
        rest.split_at(nul + 1)
    };
    let mime_type = if is_v22 {
        format!("image/{}", String::from_utf8_lossy(mime).to_lowercase())
    } else {
        String::from_utf8_lossy(&mime[..mime.len().saturating_sub(1)]).into_owned()
    };
    let (_picture_type, rest) = rest.split_first()?;
    let (desc, image) = split_at_text_terminator(encoding, rest)?;
    let description = decode_text(encoding, desc)?.trim_end_matches('\0').to_string();
    Some(CoverArt { data: image.to_vec(), mime_type, description })
}

/// Splits `rest` at the first text terminator (single NUL for Latin-1/UTF-8, double NUL aligned
/// to a UTF-16 code unit for the two UTF-16 encodings), returning `(before, after)` with the
/// terminator itself excluded from both halves.
fn split_at_text_terminator(encoding: u8, rest: &[u8]) -> Option<(&[u8], &[u8])> {
    if encoding == 1 || encoding == 2 {
        let mut i = 0;
        while i + 1 < rest.len() {
            if rest[i] == 0 && rest[i + 1] == 0 {
                return Some((&rest[..i], &rest[i + 2..]));
            }
            i += 2;
        }
        Some((rest, &[]))
    } else {
        let nul = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let after = if nul < rest.len() { &rest[nul + 1..] } else { &[] };
        Some((&rest[..nul], after))
    }
}

/// Decodes a text field per its ID3v2 text-encoding byte: 0=Latin-1, 1=UTF-16 with BOM,
/// 2=UTF-16BE without BOM, 3=UTF-8.
fn decode_text(encoding: u8, bytes: &[u8]) -> Option<String> {
    match encoding {
        0 => Some(bytes.iter().map(|&b| b as char).collect()),
        3 => Some(String::from_utf8_lossy(bytes).into_owned()),
        1 | 2 => {
            if bytes.len() < 2 {
                return Some(String::new());
            }
            let big_endian = encoding == 2 || (bytes[0] == 0xFE && bytes[1] == 0xFF);
            let body = if encoding == 1 && ((bytes[0] == 0xFF && bytes[1] == 0xFE) || (bytes[0] == 0xFE && bytes[1] == 0xFF)) {
                &bytes[2..]
            } else {
                bytes
            };
            let units: Vec<u16> = body
                .chunks_exact(2)
                .map(|c| if big_endian { u16::from_be_bytes([c[0], c[1]]) } else { u16::from_le_bytes([c[0], c[1]]) })
                .collect();
            Some(String::from_utf16_lossy(&units))
        }
        _ => None,
    }
}

/// Parses a 10-byte ID3v2 header (`"ID3"`, major, minor, flags, syncsafe size) already positioned
/// at offset 0 of a source, returning `(major, minor, flags, size)`. Callers use `size` as the
/// byte count of the tag body that follows this header.
pub fn read_header(reader: &mut Reader) -> Result<(u8, u8, u8, u32)> {
    let magic = reader.string(3, StringEncoding::Ascii)?;
    if magic != "ID3" {
        return invalid_container("missing ID3 magic");
    }
    let major = reader.read_u8()?;
    let minor = reader.read_u8()?;
    let flags = reader.read_u8()?;
    let size = reader.syncsafe_int()?;
    Ok((major, minor, flags, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latin1_frame_body(text: &str) -> Vec<u8> {
        let mut data = vec![0u8]; // encoding byte 0 = Latin-1
        data.extend_from_slice(text.as_bytes());
        data
    }

    fn build_tag_body(frames: &[(&str, Vec<u8>)]) -> (Vec<u8>, u32) {
        let mut body = Vec::new();
        for (id, data) in frames {
            body.extend_from_slice(id.as_bytes());
            body.extend_from_slice(&(data.len() as u32).to_be_bytes());
            body.extend_from_slice(&[0u8, 0u8]);
            body.extend_from_slice(data);
        }
        let size = body.len() as u32;
        body.resize(body.len() + 10, 0); // trailing padding
        (body, size + 10)
    }

    #[test]
    fn parses_text_frame() {
        let (body, tag_size) = build_tag_body(&[("TIT2", latin1_frame_body("Hi"))]);
        let mut reader = Reader::from_buffer(body.into());
        let tag = Id3v2Tag::parse(&mut reader, 3, 0, 0, tag_size).unwrap();
        let meta = tag.to_metadata();
        assert_eq!(meta.title.as_deref(), Some("Hi"));
    }

    #[test]
    fn parses_track_and_total() {
        let (body, tag_size) = build_tag_body(&[("TRCK", latin1_frame_body("3/12"))]);
        let mut reader = Reader::from_buffer(body.into());
        let tag = Id3v2Tag::parse(&mut reader, 3, 0, 0, tag_size).unwrap();
        let meta = tag.to_metadata();
        assert_eq!(meta.track_number, Some(3));
        assert_eq!(meta.track_total, Some(12));
    }

    #[test]
    fn stops_at_nul_frame_id_padding() {
        let (body, tag_size) = build_tag_body(&[("TALB", latin1_frame_body("Album"))]);
        let mut reader = Reader::from_buffer(body.into());
        let tag = Id3v2Tag::parse(&mut reader, 3, 0, 0, tag_size).unwrap();
        assert_eq!(tag.frames.len(), 1);
    }
}
