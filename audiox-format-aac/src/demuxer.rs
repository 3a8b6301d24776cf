// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ADTS demuxing: a resynchronizing frame scan. Raw AAC carries no tag metadata.

use log::{debug, trace};

use audiox_core::errors::Result;
use audiox_core::{AudioMetadata, AudioTrack, Demuxer, EncodedPacket, Seconds, Source};

use crate::header::{parse_header, SAMPLES_PER_FRAME};

struct FrameEntry {
    offset: u64,
    size: u32,
    timestamp: Seconds,
    duration: Seconds,
}

pub struct AacDemuxer {
    reader: audiox_core::io::Reader,
    track: AudioTrack,
    metadata: AudioMetadata,
    frames: Vec<FrameEntry>,
    cursor: usize,
}

impl Demuxer for AacDemuxer {
    fn open(source: Source) -> Result<Self> {
        let mut reader = audiox_core::io::Reader::open(source);
        let size = reader.size()?.unwrap_or(0);

        let frames = scan_frames(&mut reader, 0, size)?;

        let (sample_rate, channels) =
            frames.first().map(|f| (f.header_sample_rate, f.header_channels)).unwrap_or((44100, 2));

        let duration = frames.last().map(|f| f.entry.timestamp + f.entry.duration);

        let mut track = AudioTrack::new(1, 0, "aac", sample_rate, channels);
        track.duration = duration;

        let frames = frames.into_iter().map(|f| f.entry).collect();

        Ok(AacDemuxer { reader, track, metadata: AudioMetadata::new(), frames, cursor: 0 })
    }

    fn track(&self) -> &AudioTrack {
        &self.track
    }

    fn metadata(&self) -> &AudioMetadata {
        &self.metadata
    }

    fn next_packet(&mut self) -> Result<Option<EncodedPacket>> {
        if self.cursor >= self.frames.len() {
            return Ok(None);
        }
        let frame = &self.frames[self.cursor];
        self.reader.seek(frame.offset)?;
        let data = self.reader.read_bytes(frame.size as usize)?.unwrap_or_default();
        let packet = EncodedPacket::new(self.track.id, data, frame.timestamp).with_duration(frame.duration);
        self.cursor += 1;
        Ok(Some(packet))
    }

    fn seek(&mut self, time: Seconds) -> Result<()> {
        match self.frames.iter().position(|f| f.timestamp >= time) {
            Some(0) => self.cursor = 0,
            Some(i) => self.cursor = i - 1,
            None => self.cursor = self.frames.len(),
        }
        Ok(())
    }

    fn duration(&self) -> Option<Seconds> {
        self.track.duration
    }
}

struct ScannedFrame {
    entry: FrameEntry,
    header_sample_rate: u32,
    header_channels: u16,
}

/// Scans `[audio_start, audio_end)` for valid ADTS frame headers, resynchronizing by one byte on
/// any failed parse.
fn scan_frames(reader: &mut audiox_core::io::Reader, audio_start: u64, audio_end: u64) -> Result<Vec<ScannedFrame>> {
    let mut frames = Vec::new();
    let mut cursor = audio_start;
    let mut timestamp = 0.0f64;
    let mut resync_start: Option<u64> = None;

    let mut end_resync = |resync_start: &mut Option<u64>, at: u64| {
        if let Some(start) = resync_start.take() {
            trace!("aac: resynced by skipping {start}..{at}");
        }
    };

    while cursor + 7 <= audio_end {
        reader.seek(cursor)?;
        let header_bytes = match reader.read_bytes(7)? {
            Some(bytes) if bytes.len() == 7 => {
                let mut b = [0u8; 7];
                b.copy_from_slice(&bytes);
                b
            }
            _ => break,
        };

        match parse_header(header_bytes) {
            Some(header) => {
                let crc_overhead = if header.protection_absent { 0 } else { 2 };
                let frame_size = header.frame_length + crc_overhead;
                if cursor + frame_size as u64 > audio_end {
                    resync_start.get_or_insert(cursor);
                    cursor += 1;
                    continue;
                }
                end_resync(&mut resync_start, cursor);
                let duration = SAMPLES_PER_FRAME as f64 / header.sample_rate as f64;
                frames.push(ScannedFrame {
                    entry: FrameEntry { offset: cursor, size: frame_size, timestamp, duration },
                    header_sample_rate: header.sample_rate,
                    header_channels: header.channels,
                });
                timestamp += duration;
                cursor += frame_size as u64;
            }
            None => {
                resync_start.get_or_insert(cursor);
                cursor += 1;
            }
        }
    }
    end_resync(&mut resync_start, cursor);

    debug!("aac: scanned {} frames between {audio_start}..{audio_end}", frames.len());
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::build_header;
    use std::sync::Arc;

    fn frame(payload_len: usize) -> Vec<u8> {
        let header = build_header(44100, 2, 7 + payload_len as u32);
        let mut bytes = header.to_vec();
        bytes.resize(7 + payload_len, 0xAA);
        bytes
    }

    #[test]
    fn scans_consecutive_frames() {
        let mut bytes = Vec::new();
        for _ in 0..100 {
            bytes.extend_from_slice(&frame(10));
        }
        let mut demuxer = AacDemuxer::open(Source::Buffer(Arc::from(bytes.into_boxed_slice()))).unwrap();
        assert_eq!(demuxer.track().sample_rate, 44100);
        assert_eq!(demuxer.track().channels, 2);

        let mut count = 0;
        while demuxer.next_packet().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 100);
    }

    #[test]
    fn resyncs_after_junk_bytes() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&frame(10));
        bytes.extend_from_slice(&[0u8; 13]);
        bytes.extend_from_slice(&frame(10));

        let mut demuxer = AacDemuxer::open(Source::Buffer(Arc::from(bytes.into_boxed_slice()))).unwrap();
        let mut count = 0;
        while demuxer.next_packet().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn duration_accumulates_by_samples_per_frame() {
        let mut bytes = Vec::new();
        for _ in 0..100 {
            bytes.extend_from_slice(&frame(10));
        }
        let demuxer = AacDemuxer::open(Source::Buffer(Arc::from(bytes.into_boxed_slice()))).unwrap();
        let expected = 100.0 * (SAMPLES_PER_FRAME as f64 / 44100.0);
        assert!((demuxer.duration().unwrap() - expected).abs() < 1e-9);
    }
}
