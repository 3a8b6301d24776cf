// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OGG muxing: one packet per page, granule position accumulating by a fixed per-codec step.

use log::info;

use audiox_core::errors::muxer_state_error;
use audiox_core::errors::Result;
use audiox_core::io::Writer;
use audiox_core::{AudioMetadata, AudioTrackConfig, EncodedPacket, Muxer, Target};

use crate::page::{build_page, HEADER_BOS, HEADER_EOS};

const SERIAL: u32 = 1;

fn samples_per_packet(codec: &str) -> i64 {
    if codec == "opus" {
        960
    } else {
        1024
    }
}

fn vorbis_identification_packet(sample_rate: u32, channels: u16) -> Vec<u8> {
    let mut p = vec![0x01];
    p.extend_from_slice(b"vorbis");
    p.extend_from_slice(&0u32.to_le_bytes()); // bitstream version
    p.push(channels.min(255) as u8);
    p.extend_from_slice(&sample_rate.to_le_bytes());
    p.extend_from_slice(&[0u8; 8]); // bitrate_maximum/nominal/minimum, left unset
    p.push(0xB0); // blocksize_0/1 nibble pair + framing bit, nominal values
    p
}

fn vorbis_comment_packet() -> Vec<u8> {
    let mut p = vec![0x03];
    p.extend_from_slice(b"vorbis");
    let vendor = b"audiox";
    p.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    p.extend_from_slice(vendor);
    p.extend_from_slice(&0u32.to_le_bytes()); // no comments
    p.push(1); // framing bit
    p
}

/// Pass-through concatenator for the codec-private identification/comment headers followed by
/// one page per packet, as a `Muxer`. A non-`opus`/`vorbis` codec tag still gets the Vorbis
/// comment-header shape, matching the generic Vorbis-comment metadata model used elsewhere.
pub struct OggMuxer {
    writer: Option<Writer>,
    config: Option<AudioTrackConfig>,
    page_sequence: u32,
    granule: i64,
    headers_written: bool,
    finalized: bool,
}

impl Muxer for OggMuxer {
    fn create(target: Target) -> Result<Self> {
        Ok(OggMuxer { writer: Some(Writer::open(target)), config: None, page_sequence: 0, granule: 0, headers_written: false, finalized: false })
    }

    fn add_track(&mut self, config: AudioTrackConfig) -> Result<()> {
        if self.config.is_some() {
            return muxer_state_error("a track has already been added");
        }
        self.config = Some(config);
        Ok(())
    }

    fn set_metadata(&mut self, _metadata: AudioMetadata) -> Result<()> {
        // The comment header is synthesized empty; enriching it from AudioMetadata is a future
        // extension point, matching the FLAC muxer's treatment of VORBIS_COMMENT output.
        Ok(())
    }

    fn write_packet(&mut self, packet: EncodedPacket) -> Result<()> {
        if self.finalized {
            return muxer_state_error("write_packet called after finalize");
        }
        let config = self.config.as_ref().ok_or(audiox_core::errors::Error::MuxerStateError(
            "write_packet called before add_track",
        ))?;
        let writer = self.writer.as_mut().expect("writer consumed twice");

        if !self.headers_written {
            let ident = vorbis_identification_packet(config.sample_rate, config.channels);
            writer.write_bytes(&build_page(HEADER_BOS, 0, SERIAL, self.page_sequence, &ident))?;
            self.page_sequence += 1;
            writer.write_bytes(&build_page(0, 0, SERIAL, self.page_sequence, &vorbis_comment_packet()))?;
            self.page_sequence += 1;
            self.headers_written = true;
        }

        let step = samples_per_packet(&config.codec);
        self.granule += step;
        writer.write_bytes(&build_page(0, self.granule, SERIAL, self.page_sequence, &packet.data))?;
        self.page_sequence += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        if self.finalized {
            return muxer_state_error("finalize called twice");
        }
        self.finalized = true;
        let mut writer = self.writer.take().expect("writer consumed twice");

        // Mark the stream closed with a zero-length EOS page so readers see a clean end.
        writer.write_bytes(&build_page(HEADER_EOS, self.granule, SERIAL, self.page_sequence, &[]))?;
        let bytes = writer.close()?;
        info!("ogg: finalized, {} bytes", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiox_core::{Demuxer, Source};

    #[test]
    fn round_trips_through_demuxer() {
        let mut muxer = OggMuxer::create(Target::Buffer).unwrap();
        muxer.add_track(AudioTrackConfig::new("vorbis", 44100, 2)).unwrap();
        muxer.write_packet(EncodedPacket::new(1, vec![0xAA; 10], 0.0)).unwrap();
        muxer.write_packet(EncodedPacket::new(1, vec![0xBB; 10], 0.0)).unwrap();
        let bytes = muxer.finalize().unwrap();

        let mut demuxer = crate::demuxer::OggDemuxer::open(Source::Buffer(bytes.into())).unwrap();
        assert_eq!(demuxer.track().sample_rate, 44100);
        assert_eq!(demuxer.track().channels, 2);

        let mut count = 0;
        while demuxer.next_packet().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn rejects_write_before_add_track() {
        let mut muxer = OggMuxer::create(Target::Buffer).unwrap();
        assert!(muxer.write_packet(EncodedPacket::new(1, vec![0xAA], 0.0)).is_err());
    }
}
