// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Composable byte- and bit-level I/O.
//!
//! [`Reader`] and [`Writer`] are the byte-oriented cursors every demuxer and muxer builds on.
//! [`BitReader`] and [`BitWriter`] provide the sub-byte codings (unary, Exp-Golomb, Rice) that
//! FLAC's residual coding needs.

mod bit;
mod reader;
mod writer;

pub use bit::{BitReader, BitWriter};
pub use reader::{Reader, StringEncoding};
pub use writer::Writer;
