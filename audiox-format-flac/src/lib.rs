// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! FLAC demuxing and muxing, with Vorbis-comment and picture metadata.

mod blocks;
mod demuxer;
mod muxer;

pub use blocks::{BlockHeader, BlockType, FlacStreamInfo};
pub use demuxer::FlacDemuxer;
pub use muxer::FlacMuxer;

use audiox_core::FormatInfo;

pub const FORMAT_INFO: FormatInfo = FormatInfo {
    short_name: "flac",
    long_name: "Free Lossless Audio Codec",
    extensions: &["flac"],
    markers: &[b"fLaC"],
};
