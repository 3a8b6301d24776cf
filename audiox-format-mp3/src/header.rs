// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The 4-byte MPEG audio frame header: sync word, version/layer, bitrate and sample-rate tables,
//! and the resulting frame-size formula.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MpegLayer {
    Layer1,
    Layer2,
    Layer3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Mp3FrameHeader {
    pub version: MpegVersion,
    pub layer: MpegLayer,
    pub has_crc: bool,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channels: u16,
}

impl Mp3FrameHeader {
    /// Samples encoded per frame, per ISO/IEC 11172-3 / 13818-3.
    pub fn samples_per_frame(&self) -> u32 {
        match (self.version, self.layer) {
            (_, MpegLayer::Layer1) => 384,
            (_, MpegLayer::Layer2) => 1152,
            (MpegVersion::Mpeg1, MpegLayer::Layer3) => 1152,
            (_, MpegLayer::Layer3) => 576,
        }
    }

    /// Total frame size in bytes, header included.
    pub fn frame_size(&self) -> u32 {
        let padding = if self.padding { 1 } else { 0 };
        match self.layer {
            MpegLayer::Layer1 => (12 * self.bitrate_kbps * 1000 / self.sample_rate + padding) * 4,
            _ => {
                let slot = match (self.version, self.layer) {
                    (MpegVersion::Mpeg1, MpegLayer::Layer3) => 144,
                    (_, MpegLayer::Layer3) => 72,
                    _ => 144,
                };
                slot * self.bitrate_kbps * 1000 / self.sample_rate + padding
            }
        }
    }
}

// Bitrate tables in kbps, indexed `[version_group][layer][index]`. `version_group` 0 = MPEG1,
// 1 = MPEG2/2.5. Index 0 and 15 ("free"/"bad") are represented as `None`.
const BITRATE_V1: [[Option<u32>; 16]; 3] = [
    // Layer1
    [
        None, Some(32), Some(64), Some(96), Some(128), Some(160), Some(192), Some(224), Some(256),
        Some(288), Some(320), Some(352), Some(384), Some(416), Some(448), None,
    ],
    // Layer2
    [
        None, Some(32), Some(48), Some(56), Some(64), Some(80), Some(96), Some(112), Some(128),
        Some(160), Some(192), Some(224), Some(256), Some(320), Some(384), None,
    ],
    // Layer3
    [
        None, Some(32), Some(40), Some(48), Some(56), Some(64), Some(80), Some(96), Some(112),
        Some(128), Some(160), Some(192), Some(224), Some(256), Some(320), None,
    ],
];

// MPEG2/2.5 tables: Layer2 and Layer3 are identical in this implementation, carried over as-is
// (see the open question on this in the design notes).
const BITRATE_V2: [[Option<u32>; 16]; 3] = [
    // Layer1
    [
        None, Some(32), Some(48), Some(56), Some(64), Some(80), Some(96), Some(112), Some(128),
        Some(144), Some(160), Some(176), Some(192), Some(224), Some(256), None,
    ],
    // Layer2
    [
        None, Some(8), Some(16), Some(24), Some(32), Some(40), Some(48), Some(56), Some(64),
        Some(80), Some(96), Some(112), Some(128), Some(144), Some(160), None,
    ],
    // Layer3
    [
        None, Some(8), Some(16), Some(24), Some(32), Some(40), Some(48), Some(56), Some(64),
        Some(80), Some(96), Some(112), Some(128), Some(144), Some(160), None,
    ],
];

const SAMPLE_RATE_V1: [Option<u32>; 4] = [Some(44100), Some(48000), Some(32000), None];
const SAMPLE_RATE_V2: [Option<u32>; 4] = [Some(22050), Some(24000), Some(16000), None];
const SAMPLE_RATE_V25: [Option<u32>; 4] = [Some(11025), Some(12000), Some(8000), None];

fn layer_index(layer: MpegLayer) -> usize {
    match layer {
        MpegLayer::Layer1 => 0,
        MpegLayer::Layer2 => 1,
        MpegLayer::Layer3 => 2,
    }
}

/// Parses a 4-byte MPEG frame header. Returns `None` for a sync mismatch or a reserved/invalid
/// field; the caller resynchronizes by advancing one byte and retrying.
pub fn parse_header(bytes: [u8; 4]) -> Option<Mp3FrameHeader> {
    let sync = (u16::from(bytes[0]) << 3) | (u16::from(bytes[1]) >> 5);
    if sync != 0x7FF {
        return None;
    }

    let version_bits = (bytes[1] >> 3) & 0b11;
    let version = match version_bits {
        0b00 => MpegVersion::Mpeg25,
        0b10 => MpegVersion::Mpeg2,
        0b11 => MpegVersion::Mpeg1,
        _ => return None, // 0b01 reserved
    };

    let layer_bits = (bytes[1] >> 1) & 0b11;
    let layer = match layer_bits {
        0b01 => MpegLayer::Layer3,
        0b10 => MpegLayer::Layer2,
        0b11 => MpegLayer::Layer1,
        _ => return None, // 0b00 reserved
    };

    let has_crc = bytes[1] & 0b1 == 0;

    let bitrate_index = ((bytes[2] >> 4) & 0b1111) as usize;
    let sample_rate_index = ((bytes[2] >> 2) & 0b11) as usize;
    let padding = (bytes[2] >> 1) & 0b1 != 0;

    let channel_mode = (bytes[3] >> 6) & 0b11;
    let channels = if channel_mode == 0b11 { 1 } else { 2 };

    let bitrate_table = if version == MpegVersion::Mpeg1 { &BITRATE_V1 } else { &BITRATE_V2 };
    let bitrate_kbps = bitrate_table[layer_index(layer)][bitrate_index]?;

    let sample_rate_table = match version {
        MpegVersion::Mpeg1 => &SAMPLE_RATE_V1,
        MpegVersion::Mpeg2 => &SAMPLE_RATE_V2,
        MpegVersion::Mpeg25 => &SAMPLE_RATE_V25,
    };
    let sample_rate = sample_rate_table[sample_rate_index]?;

    Some(Mp3FrameHeader { version, layer, has_crc, bitrate_kbps, sample_rate, padding, channels })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mpeg1_layer3_128kbps_44100() {
        // 0xFFFB9064 style header: sync + MPEG1 + Layer3 + no CRC, bitrate idx 9 (128k),
        // sample-rate idx 0 (44100), no padding, stereo.
        let header = parse_header([0xFF, 0xFB, 0x90, 0x00]).unwrap();
        assert_eq!(header.version, MpegVersion::Mpeg1);
        assert_eq!(header.layer, MpegLayer::Layer3);
        assert_eq!(header.bitrate_kbps, 128);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.channels, 2);
        assert_eq!(header.samples_per_frame(), 1152);
    }

    #[test]
    fn rejects_bad_sync() {
        assert!(parse_header([0x00, 0x00, 0x00, 0x00]).is_none());
    }

    #[test]
    fn rejects_reserved_version() {
        assert!(parse_header([0xFF, 0xE9, 0x90, 0x00]).is_none());
    }

    #[test]
    fn frame_size_matches_reference_formula() {
        let header = parse_header([0xFF, 0xFB, 0x90, 0x00]).unwrap();
        // 144 * 128000 / 44100 = 417 (floor), no padding.
        assert_eq!(header.frame_size(), 417);
    }
}
