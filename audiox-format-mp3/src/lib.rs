// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! MPEG audio (MP3) demuxing and muxing, with ID3v1/ID3v2 tag support.

mod demuxer;
mod header;
mod muxer;

pub use demuxer::{parse_frame_header, Mp3Demuxer};
pub use header::{Mp3FrameHeader, MpegLayer, MpegVersion};
pub use muxer::Mp3Muxer;

use audiox_core::FormatInfo;

pub const FORMAT_INFO: FormatInfo = FormatInfo {
    short_name: "mp3",
    long_name: "MPEG-1/2 Audio Layer III",
    extensions: &["mp3"],
    markers: &[b"ID3", &[0xFF, 0xFB], &[0xFF, 0xFA], &[0xFF, 0xF3], &[0xFF, 0xF2]],
};
