// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! RIFF/WAVE and RF64 demuxing and muxing.

mod demuxer;
mod format;
mod muxer;

pub use demuxer::WavDemuxer;
pub use format::{Ds64Chunk, WavFormat};
pub use muxer::{AutoWavMuxer, WavMuxer};

use audiox_core::FormatInfo;

pub const FORMAT_INFO: FormatInfo = FormatInfo {
    short_name: "wav",
    long_name: "Waveform Audio (RIFF/RF64)",
    extensions: &["wav", "wave"],
    markers: &[b"RIFF", b"RF64"],
};
