// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MP3 muxing: a pass-through writer for already-framed MPEG packets.

use log::info;

use audiox_core::errors::muxer_state_error;
use audiox_core::errors::Result;
use audiox_core::io::Writer;
use audiox_core::{AudioMetadata, AudioTrackConfig, EncodedPacket, Muxer, Target};

/// Concatenates opaque MP3 frames as handed to it. ID3 emission is a no-op placeholder: nothing
/// in this scope produces a fresh ID3v2 tag on output.
pub struct Mp3Muxer {
    writer: Option<Writer>,
    has_track: bool,
    finalized: bool,
}

impl Muxer for Mp3Muxer {
    fn create(target: Target) -> Result<Self> {
        Ok(Mp3Muxer { writer: Some(Writer::open(target)), has_track: false, finalized: false })
    }

    fn add_track(&mut self, _config: AudioTrackConfig) -> Result<()> {
        if self.has_track {
            return muxer_state_error("a track has already been added");
        }
        self.has_track = true;
        Ok(())
    }

    fn set_metadata(&mut self, _metadata: AudioMetadata) -> Result<()> {
        // ID3 emission on the output side is an unimplemented extension point; metadata is
        // accepted but not written.
        Ok(())
    }

    fn write_packet(&mut self, packet: EncodedPacket) -> Result<()> {
        if self.finalized {
            return muxer_state_error("write_packet called after finalize");
        }
        if !self.has_track {
            return muxer_state_error("write_packet called before add_track");
        }
        let writer = self.writer.as_mut().expect("writer consumed twice");
        writer.write_bytes(&packet.data)
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        if self.finalized {
            return muxer_state_error("finalize called twice");
        }
        self.finalized = true;
        let writer = self.writer.take().expect("writer consumed twice");
        let bytes = writer.close()?;
        info!("mp3: finalized, {} bytes", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_packets_in_order() {
        let mut muxer = Mp3Muxer::create(Target::Buffer).unwrap();
        muxer.add_track(AudioTrackConfig::new("mp3", 44100, 2)).unwrap();
        muxer.write_packet(EncodedPacket::new(1, vec![1, 2, 3], 0.0)).unwrap();
        muxer.write_packet(EncodedPacket::new(1, vec![4, 5], 0.1)).unwrap();
        let bytes = muxer.finalize().unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn rejects_write_before_add_track() {
        let mut muxer = Mp3Muxer::create(Target::Buffer).unwrap();
        let err = muxer.write_packet(EncodedPacket::new(1, vec![0], 0.0));
        assert!(err.is_err());
    }
}
