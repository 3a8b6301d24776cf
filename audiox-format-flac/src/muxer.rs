// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FLAC muxing: magic, a single synthesized `STREAMINFO` block, then opaque frame concatenation.

use log::info;

use audiox_core::errors::muxer_state_error;
use audiox_core::errors::Result;
use audiox_core::io::Writer;
use audiox_core::{AudioMetadata, AudioTrackConfig, EncodedPacket, Muxer, Target};

/// Nominal block size assumed for every synthesized frame, since packets arrive pre-encoded and
/// this muxer never decodes them to learn the true per-frame block size.
const ASSUMED_BLOCK_SIZE: u64 = 4096;

pub struct FlacMuxer {
    writer: Option<Writer>,
    config: Option<AudioTrackConfig>,
    frames: Vec<Vec<u8>>,
    finalized: bool,
}

impl Muxer for FlacMuxer {
    fn create(target: Target) -> Result<Self> {
        Ok(FlacMuxer { writer: Some(Writer::open(target)), config: None, frames: Vec::new(), finalized: false })
    }

    fn add_track(&mut self, config: AudioTrackConfig) -> Result<()> {
        if self.config.is_some() {
            return muxer_state_error("a track has already been added");
        }
        self.config = Some(config);
        Ok(())
    }

    fn set_metadata(&mut self, _metadata: AudioMetadata) -> Result<()> {
        // Only STREAMINFO is emitted; VORBIS_COMMENT/PICTURE output is not produced here.
        Ok(())
    }

    fn write_packet(&mut self, packet: EncodedPacket) -> Result<()> {
        if self.finalized {
            return muxer_state_error("write_packet called after finalize");
        }
        if self.config.is_none() {
            return muxer_state_error("write_packet called before add_track");
        }
        self.frames.push(packet.data);
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        if self.finalized {
            return muxer_state_error("finalize called twice");
        }
        self.finalized = true;
        let config = self.config.take().ok_or(audiox_core::errors::Error::MuxerStateError("no track added"))?;
        let mut writer = self.writer.take().expect("writer consumed twice");

        writer.four_cc("fLaC")?;
        writer.write_u8(0x80)?; // is_last=1, block type 0 (STREAMINFO)
        writer.write_u24be(34)?;

        writer.write_u16be(ASSUMED_BLOCK_SIZE as u16)?;
        writer.write_u16be(ASSUMED_BLOCK_SIZE as u16)?;
        writer.write_u24be(0)?; // min_frame_size unknown
        writer.write_u24be(0)?; // max_frame_size unknown

        let total_samples = self.frames.len() as u64 * ASSUMED_BLOCK_SIZE;
        let bits_per_sample = config.bit_depth.unwrap_or(16);
        let packed = ((config.sample_rate as u64 & 0xF_FFFF) << 44)
            | ((((config.channels - 1) as u64) & 0x7) << 41)
            | ((((bits_per_sample - 1) as u64) & 0x1F) << 36)
            | (total_samples & 0xF_FFFF_FFFF);
        writer.write_u64be(packed)?;
        writer.write_bytes(&[0u8; 16])?; // md5 unknown

        for frame in std::mem::take(&mut self.frames) {
            writer.write_bytes(&frame)?;
        }

        let bytes = writer.close()?;
        info!("flac: finalized, {} bytes", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_demuxer() {
        let mut muxer = FlacMuxer::create(Target::Buffer).unwrap();
        let mut config = AudioTrackConfig::new("flac", 48000, 2);
        config.bit_depth = Some(16);
        muxer.add_track(config).unwrap();
        muxer.write_packet(EncodedPacket::new(1, vec![0xFF, 0xF8, 0xC0, 0, 0, 0, 0, 0], 0.0)).unwrap();
        let bytes = muxer.finalize().unwrap();

        use audiox_core::Demuxer;
        let demuxer = crate::demuxer::FlacDemuxer::open(audiox_core::Source::Buffer(bytes.into())).unwrap();
        assert_eq!(demuxer.track().sample_rate, 48000);
        assert_eq!(demuxer.stream_info().total_samples, 4096);
    }
}
