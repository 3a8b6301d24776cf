// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ADTS muxing: pass through packets that already carry an ADTS header, otherwise prepend one.

use log::info;

use audiox_core::errors::muxer_state_error;
use audiox_core::errors::Result;
use audiox_core::io::Writer;
use audiox_core::{AudioMetadata, AudioTrackConfig, EncodedPacket, Muxer, Target};

use crate::header::build_header;

fn has_adts_sync(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && (data[1] & 0xF6) == 0xF0
}

pub struct AacMuxer {
    writer: Option<Writer>,
    config: Option<AudioTrackConfig>,
    finalized: bool,
}

impl Muxer for AacMuxer {
    fn create(target: Target) -> Result<Self> {
        Ok(AacMuxer { writer: Some(Writer::open(target)), config: None, finalized: false })
    }

    fn add_track(&mut self, config: AudioTrackConfig) -> Result<()> {
        if self.config.is_some() {
            return muxer_state_error("a track has already been added");
        }
        self.config = Some(config);
        Ok(())
    }

    fn set_metadata(&mut self, _metadata: AudioMetadata) -> Result<()> {
        // ADTS carries no tag metadata.
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

        if has_adts_sync(&packet.data) {
            writer.write_bytes(&packet.data)?;
        } else {
            let frame_length = 7 + packet.data.len() as u32;
            let header = build_header(config.sample_rate, config.channels, frame_length);
            writer.write_bytes(&header)?;
            writer.write_bytes(&packet.data)?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        if self.finalized {
            return muxer_state_error("finalize called twice");
        }
        self.finalized = true;
        let mut writer = self.writer.take().expect("writer consumed twice");
        let bytes = writer.close()?;
        info!("aac: finalized, {} bytes", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_header_to_bare_payload() {
        let mut muxer = AacMuxer::create(Target::Buffer).unwrap();
        muxer.add_track(AudioTrackConfig::new("aac", 44100, 2)).unwrap();
        muxer.write_packet(EncodedPacket::new(1, vec![0xAA; 10], 0.0)).unwrap();
        let bytes = muxer.finalize().unwrap();
        assert_eq!(bytes.len(), 17);
        assert!(has_adts_sync(&bytes));
    }

    #[test]
    fn passes_through_existing_adts_payload() {
        let header = build_header(44100, 2, 17);
        let mut payload = header.to_vec();
        payload.extend_from_slice(&[0xAA; 10]);

        let mut muxer = AacMuxer::create(Target::Buffer).unwrap();
        muxer.add_track(AudioTrackConfig::new("aac", 44100, 2)).unwrap();
        muxer.write_packet(EncodedPacket::new(1, payload.clone(), 0.0)).unwrap();
        let bytes = muxer.finalize().unwrap();
        assert_eq!(bytes, payload);
    }

    #[test]
    fn rejects_write_before_add_track() {
        let mut muxer = AacMuxer::create(Target::Buffer).unwrap();
        assert!(muxer.write_packet(EncodedPacket::new(1, vec![0xAA], 0.0)).is_err());
    }
}
