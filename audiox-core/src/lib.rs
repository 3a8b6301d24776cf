// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Shared foundation for audiox's per-format crates: byte and bit I/O, the CRC kernel, the
//! packet/track/metadata data model, and the [`format::Demuxer`]/[`format::Muxer`] trait seam
//! that `audiox-format-*` crates implement and the `audiox` facade crate dispatches across.

pub mod crc;
pub mod errors;
pub mod format;
pub mod io;
pub mod meta;
pub mod packet;
pub mod source;
pub mod track;
pub mod units;

pub use errors::{Error, Result};
pub use format::{Demuxer, FormatInfo, Muxer};
pub use meta::{AudioMetadata, CoverArt, ReplayGain};
pub use packet::EncodedPacket;
pub use source::{ByteSink, ByteStream, Source, Target};
pub use track::{AudioTrack, AudioTrackConfig, SampleFormat};
pub use units::Seconds;
