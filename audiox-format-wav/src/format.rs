// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `fmt ` chunk and RF64's `ds64` chunk.

/// Decoded `fmt ` chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct WavFormat {
    pub format_code: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub valid_bits: Option<u16>,
    pub channel_mask: Option<u32>,
    pub sub_format: Option<[u8; 16]>,
}

impl WavFormat {
    /// The format code that actually governs sample layout: for `WAVE_FORMAT_EXTENSIBLE`
    /// (`0xFFFE`), this is derived from the leading two bytes of the sub-format GUID.
    pub fn effective_format_code(&self) -> u16 {
        if self.format_code == 0xFFFE {
            if let Some(sub) = self.sub_format {
                return u16::from_le_bytes([sub[0], sub[1]]);
            }
        }
        self.format_code
    }
}

/// Decoded `ds64` chunk, present as the first chunk of an RF64 file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Ds64Chunk {
    pub riff_size: u64,
    pub data_size: u64,
    pub sample_count: u64,
    pub table_length: u32,
}

/// PCM format code, per the Microsoft `WAVE_FORMAT_*` registry.
pub const FORMAT_PCM: u16 = 0x0001;
pub const FORMAT_IEEE_FLOAT: u16 = 0x0003;
pub const FORMAT_ALAW: u16 = 0x0006;
pub const FORMAT_ULAW: u16 = 0x0007;
pub const FORMAT_EXTENSIBLE: u16 = 0xFFFE;
