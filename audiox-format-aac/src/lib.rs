// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! ADTS (raw AAC) demuxing and muxing.

mod demuxer;
mod header;
mod muxer;

pub use demuxer::AacDemuxer;
pub use header::{parse_header, AacProfile, AdtsHeader};
pub use muxer::AacMuxer;

use audiox_core::FormatInfo;

pub const FORMAT_INFO: FormatInfo = FormatInfo {
    short_name: "aac",
    long_name: "Advanced Audio Coding (ADTS)",
    extensions: &["aac"],
    markers: &[&[0xFF, 0xF1], &[0xFF, 0xF9]],
};
