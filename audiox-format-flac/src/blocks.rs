// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FLAC metadata block headers and the `STREAMINFO` payload.

use audiox_core::errors::Result;
use audiox_core::io::Reader;

/// Metadata block type codes (low 7 bits of the block header byte).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    Other(u8),
}

impl BlockType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => BlockType::StreamInfo,
            1 => BlockType::Padding,
            2 => BlockType::Application,
            3 => BlockType::SeekTable,
            4 => BlockType::VorbisComment,
            5 => BlockType::CueSheet,
            6 => BlockType::Picture,
            other => BlockType::Other(other),
        }
    }
}

/// A metadata block header: `is_last`, type, and the 24-bit payload length that follows.
#[derive(Copy, Clone, Debug)]
pub struct BlockHeader {
    pub is_last: bool,
    pub block_type: BlockType,
    pub length: u32,
}

pub fn read_block_header(reader: &mut Reader) -> Result<BlockHeader> {
    let byte = reader.read_u8()?;
    let is_last = byte & 0x80 != 0;
    let block_type = BlockType::from_code(byte & 0x7F);
    let length = reader.read_u24be()?;
    Ok(BlockHeader { is_last, block_type, length })
}

/// The fixed 34-byte `STREAMINFO` block.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FlacStreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub total_samples: u64,
    pub md5: [u8; 16],
}

impl FlacStreamInfo {
    pub fn parse(reader: &mut Reader) -> Result<Self> {
        let min_block_size = reader.read_u16be()?;
        let max_block_size = reader.read_u16be()?;
        let min_frame_size = reader.read_u24be()?;
        let max_frame_size = reader.read_u24be()?;

        let packed = reader.read_u64be()?;
        let sample_rate = ((packed >> 44) & 0xF_FFFF) as u32;
        let channels = (((packed >> 41) & 0x7) + 1) as u16;
        let bits_per_sample = (((packed >> 36) & 0x1F) + 1) as u16;
        let total_samples = packed & 0xF_FFFF_FFFF;

        let mut md5 = [0u8; 16];
        if let Some(bytes) = reader.read_bytes(16)? {
            md5.copy_from_slice(&bytes);
        }

        Ok(FlacStreamInfo {
            min_block_size,
            max_block_size,
            min_frame_size,
            max_frame_size,
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
            md5,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn unpacks_sample_rate_channels_and_total_samples() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4096u16.to_be_bytes());
        bytes.extend_from_slice(&4096u16.to_be_bytes());
        bytes.extend_from_slice(&[0, 0, 0]); // min_frame_size
        bytes.extend_from_slice(&[0, 0, 0]); // max_frame_size

        // sample_rate=48000 (20 bits), channels-1=1 (2 ch), bits_per_sample-1=15 (16 bps),
        // total_samples=96000 (36 bits).
        let sample_rate: u64 = 48000;
        let channels_minus_one: u64 = 1;
        let bits_minus_one: u64 = 15;
        let total_samples: u64 = 96000;
        let packed = (sample_rate << 44) | (channels_minus_one << 41) | (bits_minus_one << 36) | total_samples;
        bytes.extend_from_slice(&packed.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 16]); // md5

        let mut reader = Reader::from_buffer(Arc::from(bytes.into_boxed_slice()));
        let info = FlacStreamInfo::parse(&mut reader).unwrap();
        assert_eq!(info.sample_rate, 48000);
        assert_eq!(info.channels, 2);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.total_samples, 96000);
    }
}
