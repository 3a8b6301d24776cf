// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MP3 demuxing: ID3v2/ID3v1 tag scan, then a resynchronizing MPEG frame scan.

use log::{debug, trace};

use audiox_core::errors::Result;
use audiox_core::{AudioMetadata, AudioTrack, Demuxer, EncodedPacket, Seconds, Source};
use audiox_metadata::{read_id3v2_header, Id3v1Tag, Id3v2Tag};

use crate::header::{parse_header, Mp3FrameHeader};

struct FrameEntry {
    offset: u64,
    size: u32,
    timestamp: Seconds,
    duration: Seconds,
}

pub struct Mp3Demuxer {
    reader: audiox_core::io::Reader,
    track: AudioTrack,
    metadata: AudioMetadata,
    frames: Vec<FrameEntry>,
    cursor: usize,
}

impl Demuxer for Mp3Demuxer {
    fn open(source: Source) -> Result<Self> {
        let mut reader = audiox_core::io::Reader::open(source);
        let size = reader.size()?.unwrap_or(0);

        let mut id3v2_meta = None;
        let mut audio_start = 0u64;
        if let Some(bytes) = reader.peek(3)? {
            if bytes == b"ID3" {
                reader.seek(0)?;
                let (major, minor, flags, tag_size) = read_id3v2_header(&mut reader)?;
                let tag = Id3v2Tag::parse(&mut reader, major, minor, flags, tag_size)?;
                id3v2_meta = Some(tag.to_metadata());
                audio_start = 10 + tag_size as u64;
            }
        }

        let mut id3v1_meta = None;
        let mut audio_end = size;
        if size >= 128 {
            reader.seek(size - 128)?;
            if let Some(block) = reader.read_bytes(128)? {
                if let Some(tag) = Id3v1Tag::parse(&block) {
                    id3v1_meta = Some(tag.to_metadata());
                    audio_end = size - 128;
                }
            }
        }

        let metadata = match (id3v2_meta, id3v1_meta) {
            (Some(v2), Some(v1)) => v2.merge_fallback(v1),
            (Some(v2), None) => v2,
            (None, Some(v1)) => v1,
            (None, None) => AudioMetadata::new(),
        };

        let frames = scan_frames(&mut reader, audio_start, audio_end)?;

        let (sample_rate, channels, bitrate) = frames
            .first()
            .map(|f| (f.header_sample_rate, f.header_channels, f.header_bitrate))
            .unwrap_or((44100, 2, None));

        let duration = frames.last().map(|f| f.entry.timestamp + f.entry.duration);

        let mut track = AudioTrack::new(1, 0, "mp3", sample_rate, channels);
        track.bitrate = bitrate;
        track.duration = duration;

        let frames = frames.into_iter().map(|f| f.entry).collect();

        Ok(Mp3Demuxer { reader, track, metadata, frames, cursor: 0 })
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
    header_bitrate: Option<u32>,
}

/// Scans `[audio_start, audio_end)` for valid MPEG frame headers, resynchronizing by one byte on
/// any failed parse.
fn scan_frames(reader: &mut audiox_core::io::Reader, audio_start: u64, audio_end: u64) -> Result<Vec<ScannedFrame>> {
    let mut frames = Vec::new();
    let mut cursor = audio_start;
    let mut timestamp = 0.0f64;
    let mut resync_start: Option<u64> = None;

    let mut end_resync = |resync_start: &mut Option<u64>, at: u64| {
        if let Some(start) = resync_start.take() {
            trace!("mp3: resynced by skipping {start}..{at}");
        }
    };

    while cursor + 4 <= audio_end {
        reader.seek(cursor)?;
        let header_bytes = match reader.read_bytes(4)? {
            Some(bytes) if bytes.len() == 4 => [bytes[0], bytes[1], bytes[2], bytes[3]],
            _ => break,
        };

        match parse_header(header_bytes) {
            Some(header) => {
                let frame_size = header.frame_size();
                if frame_size < 4 || cursor + frame_size as u64 > audio_end {
                    resync_start.get_or_insert(cursor);
                    cursor += 1;
                    continue;
                }
                end_resync(&mut resync_start, cursor);
                let samples = header.samples_per_frame();
                let duration = samples as f64 / header.sample_rate as f64;
                frames.push(ScannedFrame {
                    entry: FrameEntry { offset: cursor, size: frame_size, timestamp, duration },
                    header_sample_rate: header.sample_rate,
                    header_channels: header.channels,
                    header_bitrate: Some(header.bitrate_kbps * 1000),
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

    debug!("mp3: scanned {} frames between {audio_start}..{audio_end}", frames.len());
    Ok(frames)
}

/// Re-exported for callers that want the raw header parser without constructing a demuxer.
pub fn parse_frame_header(bytes: [u8; 4]) -> Option<Mp3FrameHeader> {
    parse_header(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn frame_128kbps_44100_stereo() -> Vec<u8> {
        // A single MPEG1 Layer3 frame header with no payload variance; fill the rest with zeros
        // up to the frame's declared size.
        let mut frame = vec![0xFF, 0xFB, 0x90, 0x00];
        let header = parse_header([0xFF, 0xFB, 0x90, 0x00]).unwrap();
        frame.resize(header.frame_size() as usize, 0xAA);
        frame
    }

    #[test]
    fn scans_consecutive_frames() {
        let mut bytes = Vec::new();
        for _ in 0..5 {
            bytes.extend_from_slice(&frame_128kbps_44100_stereo());
        }
        let mut demuxer = Mp3Demuxer::open(Source::Buffer(Arc::from(bytes.into_boxed_slice()))).unwrap();
        assert_eq!(demuxer.track().sample_rate, 44100);
        assert_eq!(demuxer.track().channels, 2);

        let mut count = 0;
        while demuxer.next_packet().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn resyncs_after_junk_bytes() {
        let mut bytes = Vec::new();
        for _ in 0..3 {
            bytes.extend_from_slice(&frame_128kbps_44100_stereo());
        }
        bytes.extend_from_slice(&[0u8; 17]); // junk inserted after the third frame
        for _ in 0..2 {
            bytes.extend_from_slice(&frame_128kbps_44100_stereo());
        }

        let mut demuxer = Mp3Demuxer::open(Source::Buffer(Arc::from(bytes.into_boxed_slice()))).unwrap();
        let mut count = 0;
        while demuxer.next_packet().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn extracts_id3v2_title() {
        let mut tag_body = Vec::new();
        tag_body.extend_from_slice(b"TIT2");
        let frame_data = {
            let mut d = vec![0u8];
            d.extend_from_slice(b"Hi");
            d
        };
        tag_body.extend_from_slice(&(frame_data.len() as u32).to_be_bytes());
        tag_body.extend_from_slice(&[0u8, 0u8]);
        tag_body.extend_from_slice(&frame_data);
        tag_body.resize(tag_body.len() + 10, 0);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"ID3");
        bytes.extend_from_slice(&[3, 0, 0]);
        let size = tag_body.len() as u32;
        let syncsafe = [
            ((size >> 21) & 0x7f) as u8,
            ((size >> 14) & 0x7f) as u8,
            ((size >> 7) & 0x7f) as u8,
            (size & 0x7f) as u8,
        ];
        bytes.extend_from_slice(&syncsafe);
        bytes.extend_from_slice(&tag_body);
        bytes.extend_from_slice(&frame_128kbps_44100_stereo());

        let demuxer = Mp3Demuxer::open(Source::Buffer(Arc::from(bytes.into_boxed_slice()))).unwrap();
        assert_eq!(demuxer.metadata().title.as_deref(), Some("Hi"));
    }
}
