// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! OGG demuxing and muxing: Vorbis, Opus, and FLAC-in-OGG pages with CRC-32 checksums.

mod demuxer;
mod muxer;
mod page;

pub use demuxer::OggDemuxer;
pub use muxer::OggMuxer;
pub use page::{parse_page, OggPage};

use audiox_core::FormatInfo;

pub const FORMAT_INFO: FormatInfo = FormatInfo {
    short_name: "ogg",
    long_name: "OGG (Vorbis/Opus/FLAC)",
    extensions: &["ogg", "oga", "opus"],
    markers: &[b"OggS"],
};
