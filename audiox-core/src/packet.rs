// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`EncodedPacket`]: the atomic I/O unit crossing the demuxer/muxer boundary.

use crate::units::Seconds;

/// An opaque, already-encoded audio payload with timing.
///
/// audiox never decodes packet contents; it only moves them, intact, between a demuxer and a
/// muxer (or any other consumer). For every codec covered here, a packet is independently
/// decodable, so `is_keyframe` is always `true`.
#[derive(Clone, Debug)]
pub struct EncodedPacket {
    pub data: Vec<u8>,
    pub timestamp: Seconds,
    pub duration: Option<Seconds>,
    pub is_keyframe: bool,
    pub track_id: u32,
    pub pts: Option<Seconds>,
    pub dts: Option<Seconds>,
}

impl EncodedPacket {
    pub fn new(track_id: u32, data: Vec<u8>, timestamp: Seconds) -> Self {
        EncodedPacket {
            data,
            timestamp,
            duration: None,
            is_keyframe: true,
            track_id,
            pts: None,
            dts: None,
        }
    }

    pub fn with_duration(mut self, duration: Seconds) -> Self {
        self.duration = Some(duration);
        self
    }
}
