// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The error taxonomy shared by every reader, writer, demuxer, and muxer in audiox.

use std::fmt;
use std::io;

/// `Error` enumerates every way a container operation can fail.
///
/// Each variant is stable and user-reportable: callers are expected to match on it rather than
/// parse the `Display` message.
#[derive(Debug)]
pub enum Error {
    /// A magic-byte mismatch or an impossible header field (reserved MPEG version, missing
    /// `fmt `/`data` chunk, and the like).
    InvalidContainer(&'static str),
    /// A read returned fewer bytes than required to satisfy a parse.
    TruncatedInput,
    /// Format detection returned nothing, or an output extension is not in the registry.
    UnsupportedFormat(&'static str),
    /// An operation referenced a track id the demuxer never produced, or the muxer never added.
    UnknownTrack(u32),
    /// A seek or reposition was attempted on a source/target that does not support it.
    NonSeekable,
    /// A packet was written after `finalize`, or `finalize` was called twice.
    MuxerStateError(&'static str),
    /// Bit-stream decoding ran off the end of a valid code (Exp-Golomb, unary > 32 bits, Rice).
    InvalidCode(&'static str),
    /// The backing storage (file, socket, HTTP client) reported a failure.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidContainer(msg) => write!(f, "invalid container: {msg}"),
            Error::TruncatedInput => write!(f, "truncated input: unexpected end of stream"),
            Error::UnsupportedFormat(what) => write!(f, "unsupported format: {what}"),
            Error::UnknownTrack(id) => write!(f, "unknown track id: {id}"),
            Error::NonSeekable => write!(f, "source or target does not support seeking"),
            Error::MuxerStateError(msg) => write!(f, "muxer state error: {msg}"),
            Error::InvalidCode(msg) => write!(f, "invalid bit code: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::TruncatedInput,
            _ => Error::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience constructor for an [`Error::InvalidContainer`].
pub fn invalid_container<T>(msg: &'static str) -> Result<T> {
    Err(Error::InvalidContainer(msg))
}

/// Convenience constructor for an [`Error::UnsupportedFormat`].
pub fn unsupported_format<T>(what: &'static str) -> Result<T> {
    Err(Error::UnsupportedFormat(what))
}

/// Convenience constructor for an [`Error::UnknownTrack`].
pub fn unknown_track<T>(id: u32) -> Result<T> {
    Err(Error::UnknownTrack(id))
}

/// Convenience constructor for an [`Error::MuxerStateError`].
pub fn muxer_state_error<T>(msg: &'static str) -> Result<T> {
    Err(Error::MuxerStateError(msg))
}

/// Convenience constructor for an [`Error::InvalidCode`].
pub fn invalid_code<T>(msg: &'static str) -> Result<T> {
    Err(Error::InvalidCode(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_eof_maps_to_truncated_input() {
        let io_err = io::Error::from(io::ErrorKind::UnexpectedEof);
        assert!(matches!(Error::from(io_err), Error::TruncatedInput));
    }

    #[test]
    fn other_io_errors_map_to_io_variant() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(Error::from(io_err), Error::Io(_)));
    }

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(Error::InvalidContainer("bad magic").to_string(), "invalid container: bad magic");
        assert_eq!(Error::TruncatedInput.to_string(), "truncated input: unexpected end of stream");
        assert_eq!(Error::UnsupportedFormat("xyz").to_string(), "unsupported format: xyz");
        assert_eq!(Error::UnknownTrack(3).to_string(), "unknown track id: 3");
        assert_eq!(Error::NonSeekable.to_string(), "source or target does not support seeking");
        assert_eq!(Error::MuxerStateError("finalized").to_string(), "muxer state error: finalized");
        assert_eq!(Error::InvalidCode("bad rice code").to_string(), "invalid bit code: bad rice code");
    }

    #[test]
    fn source_delegates_only_for_io_variant() {
        use std::error::Error as StdError;

        let io_err = io::Error::new(io::ErrorKind::Other, "boom");
        let wrapped = Error::Io(io_err);
        assert!(wrapped.source().is_some());

        assert!(Error::NonSeekable.source().is_none());
        assert!(Error::TruncatedInput.source().is_none());
    }
}
