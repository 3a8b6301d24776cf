// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OGG page framing: header, segment table, and the page checksum.

use audiox_core::crc::crc32_ogg;
use audiox_core::errors::{Error, Result};
use audiox_core::io::Reader;

pub const HEADER_CONTINUATION: u8 = 0x01;
pub const HEADER_BOS: u8 = 0x02;
pub const HEADER_EOS: u8 = 0x04;

pub struct OggPage {
    pub offset: u64,
    pub header_type: u8,
    pub granule_position: i64,
    pub serial: u32,
    pub page_sequence: u32,
    pub segment_table: Vec<u8>,
    pub payload: Vec<u8>,
}

impl OggPage {
    pub fn is_bos(&self) -> bool {
        self.header_type & HEADER_BOS != 0
    }

    pub fn is_eos(&self) -> bool {
        self.header_type & HEADER_EOS != 0
    }

    /// Splits the page payload into packets along the segment table. A run of 255-byte segments
    /// followed by a shorter one is not stitched back into a single packet; each nonzero segment
    /// becomes its own packet. See the module-level documentation in `demuxer.rs`.
    pub fn packets(&self) -> Vec<&[u8]> {
        let mut packets = Vec::new();
        let mut offset = 0usize;
        for &len in &self.segment_table {
            let len = len as usize;
            if len > 0 {
                packets.push(&self.payload[offset..offset + len]);
            }
            offset += len;
        }
        packets
    }
}

/// Attempts to parse one page at the reader's current position. Returns `Ok(None)` (cursor
/// restored) if the bytes at this position are not `"OggS"`, so callers can resynchronize by
/// advancing one byte and retrying.
pub fn parse_page(reader: &mut Reader) -> Result<Option<OggPage>> {
    let start = reader.position();
    let magic = reader.read_bytes(4)?;
    match magic {
        Some(bytes) if bytes == b"OggS" => {}
        _ => {
            reader.seek(start)?;
            return Ok(None);
        }
    }

    let _version = reader.read_u8()?;
    let header_type = reader.read_u8()?;
    let granule_position = reader.read_i64le()?;
    let serial = reader.read_u32le()?;
    let page_sequence = reader.read_u32le()?;
    let _checksum = reader.read_u32le()?;
    let segment_count = reader.read_u8()?;
    let segment_table = reader.read_bytes(segment_count as usize)?.ok_or(Error::TruncatedInput)?;
    let payload_len: usize = segment_table.iter().map(|&b| b as usize).sum();
    let payload = reader.read_bytes(payload_len)?.ok_or(Error::TruncatedInput)?;

    Ok(Some(OggPage { offset: start, header_type, granule_position, serial, page_sequence, segment_table, payload }))
}

fn segment_table_for(len: usize) -> Vec<u8> {
    let mut table = Vec::new();
    let mut remaining = len;
    loop {
        if remaining >= 255 {
            table.push(255);
            remaining -= 255;
        } else {
            table.push(remaining as u8);
            break;
        }
    }
    table
}

/// Serializes a full page (header, segment table, payload, checksum). The checksum field is
/// zero-filled while the CRC is computed over the whole page, then patched in at offset 22.
pub fn build_page(header_type: u8, granule_position: i64, serial: u32, page_sequence: u32, payload: &[u8]) -> Vec<u8> {
    let segment_table = segment_table_for(payload.len());

    let mut buf = Vec::with_capacity(27 + segment_table.len() + payload.len());
    buf.extend_from_slice(b"OggS");
    buf.push(0); // stream structure version
    buf.push(header_type);
    buf.extend_from_slice(&granule_position.to_le_bytes());
    buf.extend_from_slice(&serial.to_le_bytes());
    buf.extend_from_slice(&page_sequence.to_le_bytes());
    buf.extend_from_slice(&[0u8; 4]); // checksum placeholder
    buf.push(segment_table.len() as u8);
    buf.extend_from_slice(&segment_table);
    buf.extend_from_slice(payload);

    let crc = crc32_ogg(&buf);
    buf[22..26].copy_from_slice(&crc.to_le_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn builds_and_parses_round_trip() {
        let page_bytes = build_page(HEADER_BOS, 0, 42, 0, b"hello");
        let mut reader = Reader::from_buffer(Arc::from(page_bytes.into_boxed_slice()));
        let page = parse_page(&mut reader).unwrap().unwrap();
        assert!(page.is_bos());
        assert!(!page.is_eos());
        assert_eq!(page.serial, 42);
        assert_eq!(page.payload, b"hello");
    }

    #[test]
    fn segment_table_handles_exact_multiple_of_255() {
        let page_bytes = build_page(0, 0, 1, 0, &vec![0xAAu8; 255]);
        let mut reader = Reader::from_buffer(Arc::from(page_bytes.into_boxed_slice()));
        let page = parse_page(&mut reader).unwrap().unwrap();
        assert_eq!(page.segment_table, vec![255, 0]);
    }

    #[test]
    fn packets_splits_along_segment_boundaries() {
        let page_bytes = build_page(0, 0, 1, 0, b"ab");
        let mut reader = Reader::from_buffer(Arc::from(page_bytes.into_boxed_slice()));
        let page = parse_page(&mut reader).unwrap().unwrap();
        assert_eq!(page.packets(), vec![b"ab".as_slice()]);
    }

    #[test]
    fn non_ogg_bytes_return_none_and_restore_position() {
        let mut reader = Reader::from_buffer(Arc::from(vec![1u8, 2, 3, 4, 5].into_boxed_slice()));
        let result = parse_page(&mut reader).unwrap();
        assert!(result.is_none());
        assert_eq!(reader.position(), 0);
    }
}
