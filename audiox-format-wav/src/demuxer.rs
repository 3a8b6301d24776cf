// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RIFF/WAVE and RF64 demuxing.

use audiox_core::errors::{invalid_container, Error, Result};
use audiox_core::io::{Reader, StringEncoding};
use audiox_core::{AudioMetadata, AudioTrack, Demuxer, EncodedPacket, Source};

use crate::format::{Ds64Chunk, WavFormat, FORMAT_ALAW, FORMAT_IEEE_FLOAT, FORMAT_ULAW};
use audiox_core::SampleFormat;

/// Up to this many interleaved sample frames are bundled into one emitted packet.
const FRAMES_PER_PACKET: u64 = 4096;

pub struct WavDemuxer {
    reader: Reader,
    format: WavFormat,
    track: AudioTrack,
    metadata: AudioMetadata,
    data_offset: u64,
    data_size: u64,
    frames_emitted: u64,
    total_frames: u64,
}

impl WavDemuxer {
    pub fn format_info(&self) -> &WavFormat {
        &self.format
    }
}

impl Demuxer for WavDemuxer {
    fn open(source: Source) -> Result<Self> {
        let mut reader = Reader::open(source);

        let magic = reader.string(4, StringEncoding::Ascii)?;
        let is_rf64 = match magic.as_str() {
            "RIFF" => false,
            "RF64" => true,
            _ => return invalid_container("missing RIFF/RF64 magic"),
        };
        let mut riff_size = reader.read_u32le()? as u64;
        let wave = reader.string(4, StringEncoding::Ascii)?;
        if wave != "WAVE" {
            return invalid_container("missing WAVE form type");
        }

        let mut ds64: Option<Ds64Chunk> = None;
        if is_rf64 {
            let id = reader.string(4, StringEncoding::Ascii)?;
            if id != "ds64" {
                return invalid_container("RF64 file missing leading ds64 chunk");
            }
            let chunk_size = reader.read_u32le()?;
            let riff_size_lo = reader.read_u32le()? as u64;
            let riff_size_hi = reader.read_u32le()? as u64;
            let data_size_lo = reader.read_u32le()? as u64;
            let data_size_hi = reader.read_u32le()? as u64;
            let sample_count_lo = reader.read_u32le()? as u64;
            let sample_count_hi = reader.read_u32le()? as u64;
            let table_length = reader.read_u32le()?;
            // Skip any per-chunk size table entries and padding beyond the fixed 28-byte body.
            let consumed_after_size_field = 28;
            if chunk_size as u64 > consumed_after_size_field {
                reader.skip(chunk_size as u64 - consumed_after_size_field)?;
            }
            if chunk_size % 2 != 0 {
                reader.skip(1)?;
            }
            let parsed = Ds64Chunk {
                riff_size: riff_size_lo | (riff_size_hi << 32),
                data_size: data_size_lo | (data_size_hi << 32),
                sample_count: sample_count_lo | (sample_count_hi << 32),
                table_length,
            };
            riff_size = parsed.riff_size;
            ds64 = Some(parsed);
        }
        let _ = riff_size;

        let mut format: Option<WavFormat> = None;
        let mut data_offset = None;
        let mut data_size_32 = 0u64;
        let mut metadata = AudioMetadata::new();

        loop {
            let id = match reader.read_bytes(4)? {
                Some(bytes) => bytes,
                None => break,
            };
            let id = String::from_utf8_lossy(&id).into_owned();
            let size = reader.read_u32le()? as u64;

            match id.as_str() {
                "fmt " => {
                    let format_code = reader.read_u16le()?;
                    let channels = reader.read_u16le()?;
                    let sample_rate = reader.read_u32le()?;
                    let byte_rate = reader.read_u32le()?;
                    let block_align = reader.read_u16le()?;
                    let bits_per_sample = reader.read_u16le()?;
                    let mut consumed = 16u64;

                    let (mut valid_bits, mut channel_mask, mut sub_format) = (None, None, None);
                    if size > 16 {
                        let ext_size = reader.read_u16le()?;
                        consumed += 2;
                        if format_code == 0xFFFE && ext_size >= 22 {
                            valid_bits = Some(reader.read_u16le()?);
                            channel_mask = Some(reader.read_u32le()?);
                            let mut guid = [0u8; 16];
                            if let Some(bytes) = reader.read_bytes(16)? {
                                guid.copy_from_slice(&bytes);
                            }
                            sub_format = Some(guid);
                            consumed += 22;
                        }
                        if ext_size as u64 > consumed - 16 - 2 {
                            reader.skip(ext_size as u64 - (consumed - 16 - 2))?;
                        }
                        consumed = size;
                    }
                    if size > consumed {
                        reader.skip(size - consumed)?;
                    }
                    if size % 2 != 0 {
                        reader.skip(1)?;
                    }

                    format = Some(WavFormat {
                        format_code,
                        channels,
                        sample_rate,
                        byte_rate,
                        block_align,
                        bits_per_sample,
                        valid_bits,
                        channel_mask,
                        sub_format,
                    });
                }
                "data" => {
                    data_offset = Some(reader.position());
                    data_size_32 = size;
                    let effective = match &ds64 {
                        Some(d) if size == u32::MAX as u64 => d.data_size,
                        _ => size,
                    };
                    reader.skip(effective)?;
                    if effective % 2 != 0 {
                        reader.skip(1)?;
                    }
                }
                "LIST" => {
                    let list_type = reader.string(4, StringEncoding::Ascii)?;
                    let mut remaining = size.saturating_sub(4);
                    if list_type == "INFO" {
                        while remaining >= 8 {
                            let sub_id = reader.four_cc()?;
                            let sub_size = reader.read_u32le()?;
                            remaining = remaining.saturating_sub(8);
                            let data = reader.read_bytes(sub_size as usize)?.unwrap_or_default();
                            remaining = remaining.saturating_sub(sub_size as u64);
                            if sub_size % 2 != 0 {
                                reader.skip(1)?;
                                remaining = remaining.saturating_sub(1);
                            }
                            apply_info_field(&mut metadata, &sub_id, &data);
                        }
                    } else {
                        reader.skip(remaining)?;
                        remaining = 0;
                    }
                    let _ = remaining;
                    if size % 2 != 0 {
                        reader.skip(1)?;
                    }
                }
                _ => {
                    reader.skip(size)?;
                    if size % 2 != 0 {
                        reader.skip(1)?;
                    }
                }
            }

            if reader.is_eof()? {
                break;
            }
        }

        let format = format.ok_or(Error::InvalidContainer("missing fmt chunk"))?;
        let data_offset = data_offset.ok_or(Error::InvalidContainer("missing data chunk"))?;
        let data_size = match &ds64 {
            Some(d) if data_size_32 == u32::MAX as u64 => d.data_size,
            _ => data_size_32,
        };

        let codec = codec_for(format.effective_format_code());
        let total_frames = if format.block_align > 0 { data_size / format.block_align as u64 } else { 0 };
        let duration = if format.sample_rate > 0 { Some(total_frames as f64 / format.sample_rate as f64) } else { None };

        let mut track = AudioTrack::new(1, 0, codec, format.sample_rate, format.channels);
        track.bit_depth = Some(format.bits_per_sample);
        track.sample_format = sample_format_for(&format);
        track.bitrate = if format.byte_rate > 0 { Some(format.byte_rate * 8) } else { None };
        track.duration = duration;
        track.channel_layout = format.channel_mask;

        Ok(WavDemuxer { reader, format, track, metadata, data_offset, data_size, frames_emitted: 0, total_frames })
    }

    fn track(&self) -> &AudioTrack {
        &self.track
    }

    fn metadata(&self) -> &AudioMetadata {
        &self.metadata
    }

    fn next_packet(&mut self) -> Result<Option<EncodedPacket>> {
        if self.frames_emitted >= self.total_frames {
            return Ok(None);
        }
        let frames = FRAMES_PER_PACKET.min(self.total_frames - self.frames_emitted);
        let bytes = frames * self.format.block_align as u64;
        self.reader.seek(self.data_offset + self.frames_emitted * self.format.block_align as u64)?;
        let data = match self.reader.read_bytes(bytes as usize)? {
            Some(data) => data,
            None => return Ok(None),
        };
        let timestamp = self.frames_emitted as f64 / self.format.sample_rate as f64;
        self.frames_emitted += frames;
        Ok(Some(EncodedPacket::new(self.track.id, data, timestamp)))
    }

    fn seek(&mut self, time: audiox_core::Seconds) -> Result<()> {
        let target_frame = (time * self.format.sample_rate as f64).floor().max(0.0) as u64;
        self.frames_emitted = target_frame.min(self.total_frames);
        Ok(())
    }

    fn duration(&self) -> Option<audiox_core::Seconds> {
        self.track.duration
    }
}

fn codec_for(effective_format_code: u16) -> &'static str {
    match effective_format_code {
        FORMAT_ALAW => "alaw",
        FORMAT_ULAW => "ulaw",
        FORMAT_IEEE_FLOAT => "pcm",
        _ => "pcm",
    }
}

fn sample_format_for(format: &WavFormat) -> Option<SampleFormat> {
    match format.effective_format_code() {
        FORMAT_IEEE_FLOAT => match format.bits_per_sample {
            32 => Some(SampleFormat::F32),
            64 => Some(SampleFormat::F64),
            _ => None,
        },
        _ => match format.bits_per_sample {
            8 => Some(SampleFormat::U8),
            16 => Some(SampleFormat::S16),
            24 => Some(SampleFormat::S24),
            32 => Some(SampleFormat::S32),
            _ => None,
        },
    }
}

fn apply_info_field(meta: &mut AudioMetadata, id: &[u8; 4], data: &[u8]) {
    let text = || {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        String::from_utf8_lossy(&data[..end]).into_owned()
    };
    match id {
        b"INAM" => meta.title = Some(text()),
        b"IART" => meta.artist = Some(text()),
        b"IPRD" => meta.album = Some(text()),
        b"ICMT" => meta.comment = Some(text()),
        b"ICOP" => meta.copyright = Some(text()),
        b"ICRD" => meta.date = Some(text()),
        b"IGNR" => meta.genre = Some(text()),
        b"ITRK" => meta.track_number = text().trim().parse().ok(),
        b"ISFT" => meta.encoder = Some(text()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Arc;

    /// A 10,000-frame stereo 16-bit stream, built once per test binary: several tests below only
    /// read it, so there is no reason to re-synthesize it per test.
    static MULTI_FRAME_WAV: Lazy<Vec<u8>> = Lazy::new(|| build_minimal_wav(8000, 2, 16, 10_000));

    fn build_minimal_wav(sample_rate: u32, channels: u16, bits: u16, frames: u32) -> Vec<u8> {
        let block_align = channels * (bits / 8);
        let data_size = frames * block_align as u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        buf.extend(std::iter::repeat(0u8).take(data_size as usize));
        buf
    }

    #[test]
    fn one_second_duration() {
        let bytes = build_minimal_wav(44100, 1, 16, 44100);
        let demuxer = WavDemuxer::open(Source::Buffer(Arc::from(bytes.into_boxed_slice()))).unwrap();
        assert_eq!(demuxer.duration(), Some(1.0));
        assert_eq!(demuxer.track().channels, 1);
    }

    #[test]
    fn iterates_all_frames() {
        let bytes = MULTI_FRAME_WAV.clone();
        let mut demuxer = WavDemuxer::open(Source::Buffer(Arc::from(bytes.into_boxed_slice()))).unwrap();
        let mut total_bytes = 0usize;
        while let Some(packet) = demuxer.next_packet().unwrap() {
            total_bytes += packet.data.len();
        }
        assert_eq!(total_bytes, 10_000 * 2 * 2);
    }

    #[test]
    fn seek_past_end_clamps_to_total_frames() {
        let bytes = MULTI_FRAME_WAV.clone();
        let mut demuxer = WavDemuxer::open(Source::Buffer(Arc::from(bytes.into_boxed_slice()))).unwrap();
        demuxer.seek(1000.0).unwrap();
        assert!(demuxer.next_packet().unwrap().is_none());
    }

    #[test]
    fn missing_fmt_chunk_is_invalid_container() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&4u32.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        let result = WavDemuxer::open(Source::Buffer(Arc::from(buf.into_boxed_slice())));
        assert!(matches!(result, Err(Error::InvalidContainer(_))));
    }
}
