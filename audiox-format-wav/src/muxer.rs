// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RIFF/WAVE muxing, plus [`AutoWavMuxer`]'s automatic RF64 upgrade.

use log::info;

use audiox_core::errors::{muxer_state_error, Result};
use audiox_core::io::Writer;
use audiox_core::{AudioMetadata, AudioTrackConfig, EncodedPacket, Muxer, SampleFormat, Target};

use crate::format::{FORMAT_IEEE_FLOAT, FORMAT_PCM};

/// Above this many bytes of accumulated PCM payload, [`AutoWavMuxer`] switches to the RF64
/// layout rather than risk overflowing the 32-bit `data` chunk size field.
const RF64_THRESHOLD: u64 = u32::MAX as u64 - 100;

/// Whether [`AutoWavMuxer::finalize`] picks the RF64 layout for a given accumulated payload size.
fn use_rf64(data_size: u64) -> bool {
    data_size > RF64_THRESHOLD
}

struct PendingTrack {
    format_code: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    block_align: u16,
    byte_rate: u32,
}

fn pending_from_config(config: &AudioTrackConfig) -> PendingTrack {
    let format_code = match config.sample_format {
        Some(SampleFormat::F32) | Some(SampleFormat::F64) => FORMAT_IEEE_FLOAT,
        _ => FORMAT_PCM,
    };
    let bits_per_sample = config.bit_depth.unwrap_or(16);
    let block_align = config.channels * (bits_per_sample / 8).max(1);
    let byte_rate = config.sample_rate * block_align as u32;
    PendingTrack {
        format_code,
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample,
        block_align,
        byte_rate,
    }
}

fn write_fmt_chunk(writer: &mut Writer, track: &PendingTrack) -> Result<()> {
    writer.four_cc("fmt ")?;
    writer.write_u32le(16)?;
    writer.write_u16le(track.format_code)?;
    writer.write_u16le(track.channels)?;
    writer.write_u32le(track.sample_rate)?;
    writer.write_u32le(track.byte_rate)?;
    writer.write_u16le(track.block_align)?;
    writer.write_u16le(track.bits_per_sample)?;
    Ok(())
}

/// Writes a canonical RIFF/WAVE container: header, 16-byte `fmt `, `data`.
pub struct WavMuxer {
    writer: Option<Writer>,
    track: Option<PendingTrack>,
    data: Vec<u8>,
    finalized: bool,
}

impl Muxer for WavMuxer {
    fn create(target: Target) -> Result<Self> {
        Ok(WavMuxer { writer: Some(Writer::open(target)), track: None, data: Vec::new(), finalized: false })
    }

    fn add_track(&mut self, config: AudioTrackConfig) -> Result<()> {
        if self.track.is_some() {
            return muxer_state_error("a track has already been added");
        }
        self.track = Some(pending_from_config(&config));
        Ok(())
    }

    fn set_metadata(&mut self, _metadata: AudioMetadata) -> Result<()> {
        // The canonical WAV layout here has no LIST/INFO emission path; metadata is accepted but
        // silently dropped, matching the muxer's documented scope.
        Ok(())
    }

    fn write_packet(&mut self, packet: EncodedPacket) -> Result<()> {
        if self.finalized {
            return muxer_state_error("write_packet called after finalize");
        }
        if self.track.is_none() {
            return muxer_state_error("write_packet called before add_track");
        }
        self.data.extend_from_slice(&packet.data);
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        if self.finalized {
            return muxer_state_error("finalize called twice");
        }
        self.finalized = true;
        let track = self.track.take().ok_or(audiox_core::errors::Error::MuxerStateError("no track added"))?;
        let mut writer = self.writer.take().expect("writer consumed twice");

        let data_size = self.data.len() as u32;
        writer.four_cc("RIFF")?;
        writer.write_u32le(36 + data_size)?;
        writer.four_cc("WAVE")?;
        write_fmt_chunk(&mut writer, &track)?;
        writer.four_cc("data")?;
        writer.write_u32le(data_size)?;
        writer.write_bytes(&self.data)?;
        if data_size % 2 != 0 {
            writer.padding(1, 0)?;
        }

        let bytes = writer.close()?;
        info!("wav: finalized, {} bytes", bytes.len());
        Ok(bytes)
    }
}

/// A [`WavMuxer`] that transparently upgrades to the RF64 layout when the accumulated payload
/// would overflow a 32-bit `data` chunk size.
pub struct AutoWavMuxer {
    writer: Option<Writer>,
    track: Option<PendingTrack>,
    data: Vec<u8>,
    finalized: bool,
}

impl Muxer for AutoWavMuxer {
    fn create(target: Target) -> Result<Self> {
        Ok(AutoWavMuxer { writer: Some(Writer::open(target)), track: None, data: Vec::new(), finalized: false })
    }

    fn add_track(&mut self, config: AudioTrackConfig) -> Result<()> {
        if self.track.is_some() {
            return muxer_state_error("a track has already been added");
        }
        self.track = Some(pending_from_config(&config));
        Ok(())
    }

    fn set_metadata(&mut self, _metadata: AudioMetadata) -> Result<()> {
        Ok(())
    }

    fn write_packet(&mut self, packet: EncodedPacket) -> Result<()> {
        if self.finalized {
            return muxer_state_error("write_packet called after finalize");
        }
        if self.track.is_none() {
            return muxer_state_error("write_packet called before add_track");
        }
        self.data.extend_from_slice(&packet.data);
        Ok(())
    }

    fn finalize(&mut self) -> Result<Vec<u8>> {
        if self.finalized {
            return muxer_state_error("finalize called twice");
        }
        self.finalized = true;
        let track = self.track.take().ok_or(audiox_core::errors::Error::MuxerStateError("no track added"))?;
        let mut writer = self.writer.take().expect("writer consumed twice");

        let data_size = self.data.len() as u64;
        if use_rf64(data_size) {
            let sample_count = if track.block_align > 0 { data_size / track.block_align as u64 } else { 0 };
            writer.four_cc("RF64")?;
            writer.write_u32le(u32::MAX)?;
            writer.four_cc("WAVE")?;
            writer.four_cc("ds64")?;
            writer.write_u32le(28)?;
            writer.write_u64le(36 + data_size)?;
            writer.write_u64le(data_size)?;
            writer.write_u64le(sample_count)?;
            writer.write_u32le(0)?; // table_length
            write_fmt_chunk(&mut writer, &track)?;
            writer.four_cc("data")?;
            writer.write_u32le(u32::MAX)?;
        } else {
            writer.four_cc("RIFF")?;
            writer.write_u32le(36 + data_size as u32)?;
            writer.four_cc("WAVE")?;
            write_fmt_chunk(&mut writer, &track)?;
            writer.four_cc("data")?;
            writer.write_u32le(data_size as u32)?;
        }
        writer.write_bytes(&self.data)?;
        if data_size % 2 != 0 {
            writer.padding(1, 0)?;
        }

        let bytes = writer.close()?;
        info!("wav: finalized, {} bytes", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiox_core::{AudioTrackConfig, Source};

    #[test]
    fn round_trips_through_demuxer() {
        let mut muxer = WavMuxer::create(Target::Buffer).unwrap();
        let mut config = AudioTrackConfig::new("pcm", 44100, 1);
        config.bit_depth = Some(16);
        muxer.add_track(config).unwrap();
        muxer.write_packet(EncodedPacket::new(1, vec![1, 2, 3, 4], 0.0)).unwrap();
        let bytes = muxer.finalize().unwrap();

        use audiox_core::Demuxer;
        let demuxer = crate::demuxer::WavDemuxer::open(Source::Buffer(bytes.into())).unwrap();
        assert_eq!(demuxer.track().sample_rate, 44100);
        assert_eq!(demuxer.track().channels, 1);
    }

    #[test]
    fn rejects_packet_after_finalize() {
        let mut muxer = WavMuxer::create(Target::Buffer).unwrap();
        muxer.add_track(AudioTrackConfig::new("pcm", 8000, 1)).unwrap();
        muxer.finalize().unwrap();
        let err = muxer.write_packet(EncodedPacket::new(1, vec![0], 0.0));
        assert!(err.is_err());
    }

    #[test]
    fn rf64_threshold_decision_is_deterministic() {
        assert!(!use_rf64(RF64_THRESHOLD));
        assert!(use_rf64(RF64_THRESHOLD + 1));
    }

    #[test]
    fn auto_wav_stays_riff_below_threshold() {
        let mut muxer = AutoWavMuxer::create(Target::Buffer).unwrap();
        let mut config = AudioTrackConfig::new("pcm", 44100, 2);
        config.bit_depth = Some(16);
        muxer.add_track(config).unwrap();
        muxer.write_packet(EncodedPacket::new(1, vec![0; 8], 0.0)).unwrap();
        let bytes = muxer.finalize().unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
    }
}
