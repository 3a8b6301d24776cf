// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Track descriptors: [`AudioTrack`] on the demux side, [`AudioTrackConfig`] on the mux side.

use crate::units::Seconds;

/// PCM sample storage format, when known (WAV/AIFF-style containers).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    S16,
    S24,
    S32,
    F32,
    F64,
}

/// A demuxed input track.
///
/// A `Demuxer` produces at most one track in this crate: multi-track containers (if encountered)
/// are reduced to their primary audio track.
#[derive(Clone, Debug)]
pub struct AudioTrack {
    /// Muxer-assigned id. Starts at 1 and is monotonic across tracks added to a single muxer;
    /// for demuxed tracks, echoes the container's own track numbering where one exists, or `1`.
    pub id: u32,
    /// Zero-based index among tracks as encountered in the container.
    pub index: u32,
    /// A short codec tag, e.g. `"mp3"`, `"pcm"`, `"flac"`, `"aac"`, `"vorbis"`, `"opus"`.
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub channel_layout: Option<u32>,
    pub bit_depth: Option<u16>,
    pub sample_format: Option<SampleFormat>,
    pub bitrate: Option<u32>,
    pub duration: Option<Seconds>,
    pub is_default: bool,
    pub codec_description: Option<String>,
}

impl AudioTrack {
    pub fn new(id: u32, index: u32, codec: impl Into<String>, sample_rate: u32, channels: u16) -> Self {
        AudioTrack {
            id,
            index,
            codec: codec.into(),
            sample_rate,
            channels,
            channel_layout: None,
            bit_depth: None,
            sample_format: None,
            bitrate: None,
            duration: None,
            is_default: true,
            codec_description: None,
        }
    }
}

/// Output track descriptor supplied to a `Muxer` before any packets are written.
#[derive(Clone, Debug)]
pub struct AudioTrackConfig {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub channel_layout: Option<u32>,
    pub bit_depth: Option<u16>,
    pub sample_format: Option<SampleFormat>,
    pub bitrate: Option<u32>,
    pub is_default: bool,
    pub codec_description: Option<String>,
}

impl AudioTrackConfig {
    pub fn new(codec: impl Into<String>, sample_rate: u32, channels: u16) -> Self {
        AudioTrackConfig {
            codec: codec.into(),
            sample_rate,
            channels,
            channel_layout: None,
            bit_depth: None,
            sample_format: None,
            bitrate: None,
            is_default: true,
            codec_description: None,
        }
    }

    /// Builds a config that mirrors an already-demuxed track, useful as the orchestrator's
    /// starting point before applying per-field overrides.
    pub fn from_track(track: &AudioTrack) -> Self {
        AudioTrackConfig {
            codec: track.codec.clone(),
            sample_rate: track.sample_rate,
            channels: track.channels,
            channel_layout: track.channel_layout,
            bit_depth: track.bit_depth,
            sample_format: track.sample_format,
            bitrate: track.bitrate,
            is_default: track.is_default,
            codec_description: track.codec_description.clone(),
        }
    }
}
