// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CRC kernel: every checksum flavour used by the per-format demuxers and muxers.
//!
//! Four distinct CRCs appear across the supported containers, each with its own polynomial,
//! bit order, and init/final treatment:
//!   * CRC-8 (`0x07`) for FLAC frame headers, MSB-first, no reflection.
//!   * CRC-16 (`0x8005`) for MP3/FLAC frame footers, MSB-first, no reflection.
//!   * CRC-32 (`0xEDB88320`, reflected) the familiar zlib/PNG checksum.
//!   * CRC-32 (`0x04C11DB7`, MSB-first, no reflection) used by OGG page checksums.

/// CRC-8 with polynomial `0x07`, byte-wise MSB-first, no input/output reflection, init 0.
/// Used to validate FLAC frame headers.
pub fn crc8(data: &[u8]) -> u8 {
    crc8_with(data, 0x07, 0)
}

fn crc8_with(data: &[u8], poly: u8, init: u8) -> u8 {
    let mut crc = init;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ poly } else { crc << 1 };
        }
    }
    crc
}

/// Generic CRC-16, byte-wise MSB-first, no reflection.
pub fn crc16(data: &[u8], poly: u16, init: u16) -> u16 {
    let mut crc = init;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ poly } else { crc << 1 };
        }
    }
    crc
}

/// `crc16(data, 0x8005, 0xFFFF)`, used to validate MP3 frame CRC-protected headers.
pub fn crc16_mp3(data: &[u8]) -> u16 {
    crc16(data, 0x8005, 0xFFFF)
}

/// `crc16(data, 0x8005, 0)`, used on FLAC frame footers.
pub fn crc16_flac(data: &[u8]) -> u16 {
    crc16(data, 0x8005, 0)
}

/// The standard reflected CRC-32 (polynomial `0xEDB88320`, LSB-first, init `0xFFFFFFFF`, final
/// complement). This is the zlib/PNG/gzip checksum.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
        }
    }
    !crc
}

/// Builds the MSB-first, non-reflected CRC-32 table used for OGG page checksums (polynomial
/// `0x04C11DB7`). Built once per call; callers that hash many pages should cache this.
fn ogg_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 0x8000_0000 != 0 { (crc << 1) ^ 0x04C1_1DB7 } else { crc << 1 };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// OGG's page checksum: polynomial `0x04C11DB7`, MSB-first, no reflection, no final XOR, init 0.
/// `table[(crc>>24) ^ byte]` is the generator indexing rule.
///
/// The caller is responsible for zero-filling the 4-byte checksum field (page offset 22) before
/// calling this.
pub fn crc32_ogg(data: &[u8]) -> u32 {
    let table = ogg_crc32_table();
    let mut crc: u32 = 0;
    for &byte in data {
        crc = (crc << 8) ^ table[(((crc >> 24) ^ u32::from(byte)) & 0xff) as usize];
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_of_empty_is_zero() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn crc32_reference_vector() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc16_reference_vector() {
        assert_eq!(crc16(b"123456789", 0x8005, 0), 0xFEE8);
    }

    #[test]
    fn ogg_crc_over_minimal_page() {
        // A minimal OGG page with one empty segment and no payload, per the fixture in the
        // conformance suite: header with the checksum field zeroed, then the computed checksum
        // must make that same page parse cleanly (verified at the demuxer level elsewhere).
        let mut page = vec![0u8; 28];
        page[0..4].copy_from_slice(b"OggS");
        page[5] = 2; // beginning-of-stream
        page[14..18].copy_from_slice(&1u32.to_le_bytes()); // serial
        page[27] = 1; // segment_count
        page.push(0); // single zero-length segment
        let crc = crc32_ogg(&page);
        assert_ne!(crc, 0);
    }
}
