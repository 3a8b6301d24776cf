// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Abstract byte endpoints that a [`crate::io::Reader`] or [`crate::io::Writer`] can be opened
//! against.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A lazily-produced, read-once sequence of bytes.
///
/// `Stream` sources reject seeking and non-sequential reads with [`crate::errors::Error::NonSeekable`].
pub trait ByteStream: Send {
    /// Reads up to `buf.len()` bytes, returning the number of bytes actually read. Returns `0` at
    /// end of stream.
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

impl<R: std::io::Read + Send> ByteStream for R {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::Read::read(self, buf)
    }
}

/// A writable, append-only sink of bytes.
pub trait ByteSink: Send {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;
}

impl<W: std::io::Write + Send> ByteSink for W {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        std::io::Write::write_all(self, buf)
    }
}

/// Where a container's bytes come from.
///
/// `Buffer`, `File`, and `Url` all support random access. `Stream` is read-once: it rejects
/// `seek()`.
#[derive(Clone)]
pub enum Source {
    /// An in-memory byte buffer.
    Buffer(Arc<[u8]>),
    /// A local file, opened lazily on first use.
    File(PathBuf),
    /// A remote resource fetched over HTTP using `Range` requests.
    Url { url: String, headers: HashMap<String, String> },
    /// A read-once byte sequence with no random access.
    Stream(Arc<Mutex<dyn ByteStream>>),
}

impl Source {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Source::File(path.into())
    }

    pub fn from_buffer(bytes: impl Into<Arc<[u8]>>) -> Self {
        Source::Buffer(bytes.into())
    }

    /// Parses a plain string address: `http://` or `https://` prefixes select a [`Source::Url`],
    /// anything else is treated as a file path.
    pub fn from_address(addr: &str) -> Self {
        if addr.starts_with("http://") || addr.starts_with("https://") {
            Source::Url { url: addr.to_string(), headers: HashMap::new() }
        } else {
            Source::File(PathBuf::from(addr))
        }
    }

    pub fn is_seekable(&self) -> bool {
        !matches!(self, Source::Stream(_))
    }
}

/// Where a container's bytes are written to.
pub enum Target {
    /// An in-memory byte buffer, assembled on `close()`.
    Buffer,
    /// A local file, created on first write.
    File(PathBuf),
    /// A write-once byte sink (network socket, pipe, etc.).
    Stream(Arc<Mutex<dyn ByteSink>>),
}

impl Target {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Target::File(path.into())
    }
}

/// A cached window over a [`Source`]: an owned byte sequence plus its absolute offset.
///
/// Invariant: [`FileSlice::get`] must only be called when [`FileSlice::contains`] holds for the
/// same `(pos, len)` pair.
#[derive(Default)]
pub struct FileSlice {
    data: Vec<u8>,
    offset: u64,
}

impl FileSlice {
    pub fn new(data: Vec<u8>, offset: u64) -> Self {
        FileSlice { data, offset }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if the byte range `[pos, pos+len)` lies entirely within this slice.
    pub fn contains(&self, pos: u64, len: usize) -> bool {
        if pos < self.offset {
            return false;
        }
        let rel_start = (pos - self.offset) as usize;
        rel_start.checked_add(len).is_some_and(|end| end <= self.data.len())
    }

    /// Returns the requested range. Panics if [`FileSlice::contains`] does not hold; callers must
    /// check first.
    pub fn get(&self, pos: u64, len: usize) -> &[u8] {
        debug_assert!(self.contains(pos, len));
        let rel_start = (pos - self.offset) as usize;
        &self.data[rel_start..rel_start + len]
    }
}
