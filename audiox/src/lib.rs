// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! A format registry and conversion orchestrator layered over the per-format demuxer/muxer
//! crates: [`audiox_format_wav`], [`audiox_format_mp3`], [`audiox_format_flac`],
//! [`audiox_format_aac`], and [`audiox_format_ogg`].

pub mod conversion;
pub mod registry;

pub use conversion::{Conversion, ConversionOptions, ProgressUpdate};
pub use registry::{DemuxerHandle, FormatRegistry, MuxerHandle};

pub use audiox_core::errors::{Error, Result};
pub use audiox_core::{
    AudioMetadata, AudioTrack, AudioTrackConfig, CoverArt, Demuxer, EncodedPacket, FormatInfo, Muxer, ReplayGain,
    SampleFormat, Source, Target,
};
