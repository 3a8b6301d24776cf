// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`Reader`]: a byte-oriented, random-access cursor over any [`Source`].

use std::fs::File;
use std::io::{Seek as _, SeekFrom};
use std::sync::{Arc, Mutex};

use log::trace;

use crate::errors::{Error, Result};
use crate::source::{ByteStream, FileSlice, Source};

/// Minimum length of the slice [`Reader`] keeps cached, per the caching contract.
const MIN_SLICE_LEN: usize = 64 * 1024;

/// Text encodings accepted by [`Reader::string`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StringEncoding {
    Utf8,
    Ascii,
    Latin1,
}

enum Backend {
    Unopened,
    Buffer(Arc<[u8]>),
    File(File),
    #[cfg(feature = "http")]
    Url(HttpBackend),
    Stream { inner: Arc<Mutex<dyn ByteStream>>, consumed: u64 },
}

#[cfg(feature = "http")]
struct HttpBackend {
    client: reqwest::blocking::Client,
    url: String,
    headers: std::collections::HashMap<String, String>,
    content_length: Option<u64>,
}

#[cfg(feature = "http")]
impl HttpBackend {
    fn new(url: String, headers: std::collections::HashMap<String, String>) -> Result<Self> {
        let client = reqwest::blocking::Client::new();

        let mut head = client.head(&url);
        for (k, v) in &headers {
            head = head.header(k.as_str(), v.as_str());
        }
        let content_length = head
            .send()
            .ok()
            .and_then(|resp| resp.content_length())
            .or_else(|| None);

        Ok(HttpBackend { client, url, headers, content_length })
    }

    fn fetch_range(&self, start: u64, len: usize) -> Result<Vec<u8>> {
        let end = start + len as u64 - 1;
        let mut req = self.client.get(&self.url).header("Range", format!("bytes={start}-{end}"));
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req
            .send()
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        let bytes = resp
            .bytes()
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        Ok(bytes.to_vec())
    }
}

/// A byte-oriented, random-access reader with a sliding cached slice.
///
/// Opened lazily: the first read triggers [`Source`] initialization (opening the file, issuing
/// the HTTP `HEAD`, etc). [`Reader::close`] releases any underlying handle; it is idempotent.
pub struct Reader {
    source_kind: SourceKind,
    backend: Backend,
    slice: FileSlice,
    position: u64,
    size: Option<u64>,
    closed: bool,
}

enum SourceKind {
    Buffer,
    File(std::path::PathBuf),
    #[cfg(feature = "http")]
    Url(String, std::collections::HashMap<String, String>),
    #[cfg(not(feature = "http"))]
    Url,
    Stream(Arc<Mutex<dyn ByteStream>>),
}

impl Reader {
    fn new(source: Source) -> Self {
        let source_kind = match &source {
            Source::Buffer(_) => SourceKind::Buffer,
            Source::File(path) => SourceKind::File(path.clone()),
            #[cfg(feature = "http")]
            Source::Url { url, headers } => SourceKind::Url(url.clone(), headers.clone()),
            #[cfg(not(feature = "http"))]
            Source::Url { .. } => SourceKind::Url,
            Source::Stream(stream) => SourceKind::Stream(Arc::clone(stream)),
        };

        let size = if let Source::Buffer(bytes) = &source {
            Some(bytes.len() as u64)
        } else {
            None
        };

        Reader { source_kind, backend: Backend::Unopened, slice: FileSlice::default(), position: 0, size, closed: false }
    }

    fn ensure_open(&mut self) -> Result<()> {
        if !matches!(self.backend, Backend::Unopened) {
            return Ok(());
        }

        self.backend = match &self.source_kind {
            SourceKind::Buffer => {
                // Buffer sources carry their bytes directly; re-derive them from the original
                // `Source` isn't possible here since we only kept the kind, so buffers are
                // special-cased in `new` via `self.size` and a dedicated constructor below.
                unreachable!("buffer backend opened via Reader::from_buffer")
            }
            SourceKind::File(path) => {
                let file = File::open(path)?;
                self.size = Some(file.metadata()?.len());
                Backend::File(file)
            }
            #[cfg(feature = "http")]
            SourceKind::Url(url, headers) => {
                let backend = HttpBackend::new(url.clone(), headers.clone())?;
                self.size = backend.content_length;
                Backend::Url(backend)
            }
            #[cfg(not(feature = "http"))]
            SourceKind::Url => {
                return Err(Error::UnsupportedFormat("http source support not compiled in"));
            }
            SourceKind::Stream(stream) => Backend::Stream { inner: Arc::clone(stream), consumed: 0 },
        };

        Ok(())
    }

    /// Builds a `Reader` directly over an in-memory buffer.
    pub fn from_buffer(bytes: Arc<[u8]>) -> Self {
        let size = bytes.len() as u64;
        Reader {
            source_kind: SourceKind::Buffer,
            backend: Backend::Buffer(bytes),
            slice: FileSlice::default(),
            position: 0,
            size: Some(size),
            closed: false,
        }
    }

    pub fn open(source: Source) -> Self {
        if let Source::Buffer(bytes) = source {
            Reader::from_buffer(bytes)
        } else {
            Reader::new(source)
        }
    }

    /// Total size in bytes, if known.
    pub fn size(&mut self) -> Result<Option<u64>> {
        self.ensure_open()?;
        Ok(self.size)
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn is_eof(&mut self) -> Result<bool> {
        self.ensure_open()?;
        match self.size {
            Some(size) => Ok(self.position >= size),
            None => Ok(false),
        }
    }

    /// Seeks the logical cursor to an absolute byte offset.
    ///
    /// Fails with [`Error::NonSeekable`] for `Stream` sources.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.ensure_open()?;
        if matches!(self.backend, Backend::Stream { .. }) {
            return Err(Error::NonSeekable);
        }
        self.position = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.seek(self.position.saturating_add(n))
    }

    /// Reloads the cached slice so that it starts at `pos` and is at least
    /// `max(requested, MIN_SLICE_LEN)` bytes long, or shorter near EOF.
    fn reload(&mut self, pos: u64, requested: usize) -> Result<()> {
        let want = requested.max(MIN_SLICE_LEN);

        let data = match &mut self.backend {
            Backend::Unopened => unreachable!("ensure_open was not called"),
            Backend::Buffer(bytes) => {
                let start = (pos as usize).min(bytes.len());
                let end = start.saturating_add(want).min(bytes.len());
                bytes[start..end].to_vec()
            }
            Backend::File(file) => {
                file.seek(SeekFrom::Start(pos))?;
                let mut buf = vec![0u8; want];
                let mut filled = 0;
                loop {
                    match std::io::Read::read(file, &mut buf[filled..]) {
                        Ok(0) => break,
                        Ok(n) => filled += n,
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(Error::from(e)),
                    }
                }
                buf.truncate(filled);
                buf
            }
            #[cfg(feature = "http")]
            Backend::Url(backend) => {
                let want = match backend.content_length {
                    Some(len) if pos >= len => 0,
                    Some(len) => want.min((len - pos) as usize),
                    None => want,
                };
                if want == 0 {
                    Vec::new()
                } else {
                    backend.fetch_range(pos, want)?
                }
            }
            Backend::Stream { inner, consumed } => {
                if pos != *consumed {
                    return Err(Error::NonSeekable);
                }
                let mut guard = inner.lock().expect("stream mutex poisoned");
                let mut buf = vec![0u8; want];
                let mut filled = 0;
                loop {
                    match guard.read(&mut buf[filled..]) {
                        Ok(0) => break,
                        Ok(n) => filled += n,
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(Error::from(e)),
                    }
                }
                drop(guard);
                buf.truncate(filled);
                *consumed += buf.len() as u64;
                buf
            }
        };

        trace!("reader: reloaded {} bytes at offset {pos}", data.len());
        self.slice = FileSlice::new(data, pos);
        Ok(())
    }

    /// Reads `n` bytes starting at the current position, advancing the cursor. Returns `None` at
    /// end of stream (fewer than `n` bytes remain).
    pub fn read_bytes(&mut self, n: usize) -> Result<Option<Vec<u8>>> {
        self.ensure_open()?;

        if !self.slice.contains(self.position, n) {
            self.reload(self.position, n)?;
            if !self.slice.contains(self.position, n) {
                return Ok(None);
            }
        }

        let out = self.slice.get(self.position, n).to_vec();
        self.position += n as u64;
        Ok(Some(out))
    }

    /// Reads `n` bytes without advancing the cursor.
    pub fn peek(&mut self, n: usize) -> Result<Option<Vec<u8>>> {
        let saved = self.position;
        let result = self.read_bytes(n);
        self.position = saved;
        result
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        self.read_bytes(n)?.ok_or(Error::TruncatedInput)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_exact(2)?.try_into().unwrap()))
    }

    pub fn read_u16le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_exact(2)?.try_into().unwrap()))
    }

    pub fn read_i16be(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_exact(2)?.try_into().unwrap()))
    }

    pub fn read_i16le(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_exact(2)?.try_into().unwrap()))
    }

    pub fn read_u24be(&mut self) -> Result<u32> {
        let b = self.read_exact(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_u24le(&mut self) -> Result<u32> {
        let b = self.read_exact(3)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    pub fn read_u32be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_exact(4)?.try_into().unwrap()))
    }

    pub fn read_u32le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_exact(4)?.try_into().unwrap()))
    }

    pub fn read_i32be(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_exact(4)?.try_into().unwrap()))
    }

    pub fn read_i32le(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_exact(4)?.try_into().unwrap()))
    }

    pub fn read_u64be(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_exact(8)?.try_into().unwrap()))
    }

    pub fn read_u64le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_exact(8)?.try_into().unwrap()))
    }

    pub fn read_i64be(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_exact(8)?.try_into().unwrap()))
    }

    pub fn read_i64le(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_exact(8)?.try_into().unwrap()))
    }

    pub fn read_f32be(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_exact(4)?.try_into().unwrap()))
    }

    pub fn read_f32le(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_exact(4)?.try_into().unwrap()))
    }

    pub fn read_f64be(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.read_exact(8)?.try_into().unwrap()))
    }

    pub fn read_f64le(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_exact(8)?.try_into().unwrap()))
    }

    /// Reads `n` bytes and decodes them using `encoding`. Invalid UTF-8 under `Utf8` is replaced
    /// lossily; `Ascii` and `Latin1` map each byte to its Unicode scalar value directly.
    pub fn string(&mut self, n: usize, encoding: StringEncoding) -> Result<String> {
        let bytes = self.read_exact(n)?;
        Ok(match encoding {
            StringEncoding::Utf8 => String::from_utf8_lossy(&bytes).into_owned(),
            StringEncoding::Ascii | StringEncoding::Latin1 => {
                bytes.iter().map(|&b| b as char).collect()
            }
        })
    }

    /// Reads a NUL-terminated (or `max`-bounded) string.
    pub fn c_string(&mut self, max: usize) -> Result<String> {
        let mut out = Vec::new();
        for _ in 0..max {
            let b = self.read_u8()?;
            if b == 0 {
                return Ok(String::from_utf8_lossy(&out).into_owned());
            }
            out.push(b);
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Reads exactly 4 ASCII bytes as a FourCC.
    pub fn four_cc(&mut self) -> Result<[u8; 4]> {
        Ok(self.read_exact(4)?.try_into().unwrap())
    }

    /// Reads a 32-bit syncsafe integer: four bytes, each with bit 7 clear, packed 7-bits-per-byte
    /// big-endian (ID3v2.4 frame sizes, and the tag size field in the ID3v2 header).
    pub fn syncsafe_int(&mut self) -> Result<u32> {
        let b = self.read_exact(4)?;
        Ok(((b[0] as u32 & 0x7f) << 21)
            | ((b[1] as u32 & 0x7f) << 14)
            | ((b[2] as u32 & 0x7f) << 7)
            | (b[3] as u32 & 0x7f))
    }

    /// Releases any underlying file handle. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.backend = Backend::Unopened;
        self.closed = true;
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    fn reader_of(bytes: &[u8]) -> Reader {
        Reader::from_buffer(Arc::from(bytes.to_vec().into_boxed_slice()))
    }

    /// A 200 KiB ramp pattern, built once per test binary: several tests below need a buffer
    /// large enough to force `reload`, but none of them need their own copy.
    static LARGE_BUFFER: Lazy<Vec<u8>> = Lazy::new(|| (0..200_000u32).map(|i| (i % 256) as u8).collect());

    #[test]
    fn reads_typed_values() {
        let mut r = reader_of(&[0x00, 0x01, 0xff, 0xfe, 0x41, 0x42, 0x43, 0x44, 0x00]);
        assert_eq!(r.read_u16be().unwrap(), 0x0001);
        assert_eq!(r.read_u16le().unwrap(), 0xfeff);
        assert_eq!(r.four_cc().unwrap(), *b"ABCD");
        assert_eq!(r.read_u8().unwrap(), 0);
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn peek_does_not_advance() {
        let mut r = reader_of(&[1, 2, 3, 4]);
        assert_eq!(r.peek(2).unwrap(), Some(vec![1, 2]));
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_bytes(2).unwrap(), Some(vec![1, 2]));
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn syncsafe_roundtrip() {
        // 0x00201 encoded as a syncsafe u32 is 0x00 0x00 0x01 0x21 (bits packed 7 at a time).
        let mut r = reader_of(&[0x00, 0x00, 0x01, 0x21]);
        assert_eq!(r.syncsafe_int().unwrap(), 0x00201);
    }

    #[test]
    fn c_string_stops_at_nul() {
        let mut r = reader_of(b"hi\0trailing");
        assert_eq!(r.c_string(256).unwrap(), "hi");
    }

    #[test]
    fn reload_satisfies_request_spanning_initial_slice() {
        let data = &*LARGE_BUFFER;
        let mut r = reader_of(data);
        r.seek(70_000).unwrap();
        let got = r.read_bytes(10).unwrap().unwrap();
        assert_eq!(got, data[70_000..70_010].to_vec());
    }

    #[test]
    fn reload_satisfies_request_near_buffer_end() {
        let data = &*LARGE_BUFFER;
        let mut r = reader_of(data);
        r.seek(199_990).unwrap();
        let got = r.read_bytes(10).unwrap().unwrap();
        assert_eq!(got, data[199_990..200_000].to_vec());
    }

    #[test]
    fn eof_returns_none_not_error() {
        let mut r = reader_of(&[1, 2, 3]);
        assert_eq!(r.read_bytes(10).unwrap(), None);
    }
}
