// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Tag formats shared across audiox's containers: ID3v1, ID3v2, Vorbis comment, and the FLAC
//! `PICTURE` block layout reused by OGG's comment-embedded pictures.

mod id3v1;
mod id3v2;
mod picture;
mod vorbis;

pub use id3v1::Id3v1Tag;
pub use id3v2::{read_header as read_id3v2_header, Id3v2Frame, Id3v2Tag};
pub use picture::FlacPicture;
pub use vorbis::VorbisComment;
