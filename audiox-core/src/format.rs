// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The polymorphic seam: [`Demuxer`] and [`Muxer`] trait objects, and the [`FormatInfo`]
//! descriptor a format crate registers itself under.

use crate::errors::Result;
use crate::meta::AudioMetadata;
use crate::packet::EncodedPacket;
use crate::source::{Source, Target};
use crate::track::{AudioTrack, AudioTrackConfig};
use crate::units::Seconds;

/// Static facts about a container format, as declared by the crate that implements it.
///
/// A [`crate::registry::FormatRegistry`] (defined in the `audiox` facade crate) collects these to
/// resolve a format by name, extension, or magic bytes without depending on any one format crate.
#[derive(Copy, Clone, Debug)]
pub struct FormatInfo {
    /// Short, lowercase identifier, e.g. `"wav"`, `"mp3"`, `"flac"`, `"aac"`, `"ogg"`.
    pub short_name: &'static str,
    pub long_name: &'static str,
    /// File extensions this format is conventionally stored under, without the leading dot.
    pub extensions: &'static [&'static str],
    /// Byte sequences, any one of which identifies this format when found at the start of a
    /// source (or, for formats with a leading tag, immediately after it).
    pub markers: &'static [&'static [u8]],
}

/// A source of demuxed packets and, optionally, metadata.
///
/// Implementors own a [`crate::io::Reader`] and are constructed from a [`Source`]; callers drive
/// iteration with [`Demuxer::next_packet`] until it returns `Ok(None)`.
pub trait Demuxer: Send {
    /// Opens `source` and parses enough of it to describe the track and any leading metadata.
    /// Returns [`crate::errors::Error::InvalidContainer`] if the source does not match this
    /// format.
    fn open(source: Source) -> Result<Self>
    where
        Self: Sized;

    /// The single audio track this demuxer exposes.
    fn track(&self) -> &AudioTrack;

    /// Sparse metadata collected while opening the container (ID3, Vorbis comment, and the like).
    fn metadata(&self) -> &AudioMetadata;

    /// Returns the next packet, or `Ok(None)` at end of stream.
    fn next_packet(&mut self) -> Result<Option<EncodedPacket>>;

    /// Repositions so the next [`Demuxer::next_packet`] returns the packet containing `time`, or
    /// the nearest following packet if none contains it exactly.
    ///
    /// Returns [`crate::errors::Error::NonSeekable`] if the underlying source rejects seeking.
    fn seek(&mut self, time: Seconds) -> Result<()>;

    /// Total stream duration, when derivable without a full scan (a `STREAMINFO` block, a `fmt `
    /// chunk's data length, or similar).
    fn duration(&self) -> Option<Seconds> {
        self.track().duration
    }
}

/// A sink that accepts packets for exactly one track and assembles them into a container.
///
/// A muxer's lifecycle is `add_track` (exactly once) then any number of `write_packet` calls,
/// then exactly one `finalize`. Calling `write_packet` after `finalize`, or `finalize` twice, is
/// an [`crate::errors::Error::MuxerStateError`].
pub trait Muxer: Send {
    /// Opens `target` for writing. The returned muxer has no track yet.
    fn create(target: Target) -> Result<Self>
    where
        Self: Sized;

    /// Declares the single track this muxer will carry. Must be called before any
    /// [`Muxer::write_packet`].
    fn add_track(&mut self, config: AudioTrackConfig) -> Result<()>;

    /// Attaches metadata to be written with the container. Implementations that cannot carry
    /// metadata (bare ADTS, for instance) silently ignore fields they have no slot for.
    fn set_metadata(&mut self, metadata: AudioMetadata) -> Result<()>;

    /// Appends one packet to the track added by [`Muxer::add_track`].
    fn write_packet(&mut self, packet: EncodedPacket) -> Result<()>;

    /// Flushes any buffered header/trailer data and returns the underlying target's bytes, if it
    /// is a [`Target::Buffer`]; otherwise returns an empty vector.
    fn finalize(&mut self) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_info_is_const_constructible() {
        const INFO: FormatInfo = FormatInfo {
            short_name: "wav",
            long_name: "Waveform Audio",
            extensions: &["wav", "wave"],
            markers: &[b"RIFF", b"RF64"],
        };
        assert_eq!(INFO.short_name, "wav");
        assert!(INFO.markers.contains(&b"RIFF".as_slice()));
    }
}
