// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ADTS frame headers: a 7-byte (9 with CRC) self-synchronizing header preceding each AAC frame.

/// Sampling-frequency table indexed by the 4-bit `sampling_frequency_index`. Indices 13-15 are
/// reserved/invalid.
pub const SAMPLE_RATE_TABLE: [Option<u32>; 16] = [
    Some(96000),
    Some(88200),
    Some(64000),
    Some(48000),
    Some(44100),
    Some(32000),
    Some(24000),
    Some(22050),
    Some(16000),
    Some(12000),
    Some(11025),
    Some(8000),
    Some(7350),
    None,
    None,
    None,
];

pub const SAMPLES_PER_FRAME: u32 = 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AacProfile {
    Main,
    Lc,
    Ssr,
    Ltp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AdtsHeader {
    pub mpeg4: bool,
    pub protection_absent: bool,
    pub profile: AacProfile,
    pub sample_rate: u32,
    pub sampling_frequency_index: u8,
    pub channels: u16,
    pub frame_length: u32,
}

fn profile_from_bits(bits: u8) -> AacProfile {
    match bits {
        0 => AacProfile::Main,
        1 => AacProfile::Lc,
        2 => AacProfile::Ssr,
        _ => AacProfile::Ltp,
    }
}

pub fn profile_bits(profile: AacProfile) -> u8 {
    match profile {
        AacProfile::Main => 0,
        AacProfile::Lc => 1,
        AacProfile::Ssr => 2,
        AacProfile::Ltp => 3,
    }
}

/// Parses a 7-byte ADTS fixed+variable header. Returns `None` on sync mismatch, a non-zero
/// `layer` field, or a reserved sampling-frequency index.
pub fn parse_header(b: [u8; 7]) -> Option<AdtsHeader> {
    let sync = (u16::from(b[0]) << 4) | (u16::from(b[1]) >> 4);
    if sync != 0xFFF {
        return None;
    }

    let mpeg4 = (b[1] >> 3) & 0b1 == 0;
    let layer = (b[1] >> 1) & 0b11;
    if layer != 0 {
        return None;
    }
    let protection_absent = b[1] & 0b1 != 0;

    let profile_bits = (b[2] >> 6) & 0b11;
    let profile = profile_from_bits(profile_bits);
    let sampling_frequency_index = (b[2] >> 2) & 0b1111;
    let sample_rate = SAMPLE_RATE_TABLE[sampling_frequency_index as usize]?;

    let channel_config = ((b[2] & 0b1) << 2) | ((b[3] >> 6) & 0b11);
    if channel_config == 0 {
        return None; // externally-defined configuration: not representable here
    }

    let frame_length =
        (u32::from(b[3] & 0b11) << 11) | (u32::from(b[4]) << 3) | u32::from(b[5] >> 5);
    if frame_length < 7 {
        return None;
    }

    Some(AdtsHeader {
        mpeg4,
        protection_absent,
        profile,
        sample_rate,
        sampling_frequency_index,
        channels: u16::from(channel_config),
        frame_length,
    })
}

/// Looks up the sampling-frequency index for a sample rate, falling back to 44100 Hz (index 4)
/// when the exact rate is not a standard ADTS rate.
pub fn sample_rate_index(sample_rate: u32) -> u8 {
    SAMPLE_RATE_TABLE
        .iter()
        .position(|&r| r == Some(sample_rate))
        .map(|i| i as u8)
        .unwrap_or(4)
}

/// Builds a 7-byte ADTS header (`protection_absent = true`) for `frame_length` total bytes
/// (header + payload).
pub fn build_header(sample_rate: u32, channels: u16, frame_length: u32) -> [u8; 7] {
    let freq_index = sample_rate_index(sample_rate);
    let channel_config = (channels.clamp(1, 7)) as u8;
    let profile = profile_bits(AacProfile::Lc);

    let mut b = [0u8; 7];
    b[0] = 0xFF;
    b[1] = 0xF0 | (0 << 3) /* MPEG-4 */ | (0 << 1) /* layer */ | 0b1 /* protection_absent */;
    b[2] = (profile << 6) | (freq_index << 2) | ((channel_config >> 2) & 0b1);
    let buffer_fullness: u16 = 0x7FF; // VBR marker
    b[3] = ((channel_config & 0b11) << 6) | (((frame_length >> 11) & 0b11) as u8);
    b[4] = ((frame_length >> 3) & 0xFF) as u8;
    b[5] = (((frame_length & 0b111) as u8) << 5) | ((buffer_fullness >> 6) as u8 & 0x1F);
    b[6] = (((buffer_fullness & 0x3F) as u8) << 2) | 0; // raw_data_blocks_in_frame = 0
    b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_parses_round_trip() {
        let header_bytes = build_header(44100, 2, 100);
        let header = parse_header(header_bytes).unwrap();
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.channels, 2);
        assert_eq!(header.frame_length, 100);
        assert!(header.protection_absent);
    }

    #[test]
    fn rejects_bad_sync() {
        assert!(parse_header([0, 0, 0, 0, 0, 0, 0]).is_none());
    }

    #[test]
    fn rejects_reserved_sampling_index() {
        let mut bytes = build_header(44100, 2, 100);
        // Force sampling_frequency_index to 13 (reserved).
        bytes[2] = (bytes[2] & 0b1100_0011) | (13 << 2);
        assert!(parse_header(bytes).is_none());
    }

    #[test]
    fn unknown_rate_falls_back_to_44100_index() {
        assert_eq!(sample_rate_index(44100), 4);
        assert_eq!(sample_rate_index(12345), 4);
    }
}
