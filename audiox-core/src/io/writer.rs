// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`Writer`]: an append-only writer with deferred flush, the mirror of [`crate::io::Reader`].

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::sync::{Arc, Mutex};

use crate::errors::Result;
use crate::source::{ByteSink, Target};

enum Backend {
    /// Buffer and File targets accumulate fragments in memory and are flushed on `close`.
    Deferred(Vec<u8>),
    File { path: std::path::PathBuf, file: Option<BufWriter<File>> },
    Stream(Arc<Mutex<dyn ByteSink>>),
}

/// An append-only byte writer.
///
/// `Buffer` and `File` targets collect writes into an in-memory fragment list, flushed on
/// [`Writer::close`]. `Stream` targets write through immediately as each call arrives.
pub struct Writer {
    backend: Backend,
    position: u64,
}

impl Writer {
    pub fn open(target: Target) -> Self {
        let backend = match target {
            Target::Buffer => Backend::Deferred(Vec::new()),
            Target::File(path) => Backend::File { path, file: None },
            Target::Stream(sink) => Backend::Stream(sink),
        };
        Writer { backend, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.backend {
            Backend::Deferred(buf) => buf.extend_from_slice(bytes),
            Backend::File { path, file } => {
                if file.is_none() {
                    *file = Some(BufWriter::new(File::create(&*path)?));
                }
                std::io::Write::write_all(file.as_mut().unwrap(), bytes)?;
            }
            Backend::Stream(sink) => {
                let mut guard = sink.lock().expect("stream mutex poisoned");
                guard.write_all(bytes)?;
            }
        }
        self.position += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_raw(&[v])
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_u8(v as u8)
    }

    pub fn write_u16be(&mut self, v: u16) -> Result<()> {
        self.write_raw(&v.to_be_bytes())
    }

    pub fn write_u16le(&mut self, v: u16) -> Result<()> {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_i16be(&mut self, v: i16) -> Result<()> {
        self.write_raw(&v.to_be_bytes())
    }

    pub fn write_i16le(&mut self, v: i16) -> Result<()> {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_u24be(&mut self, v: u32) -> Result<()> {
        let b = v.to_be_bytes();
        self.write_raw(&b[1..4])
    }

    pub fn write_u24le(&mut self, v: u32) -> Result<()> {
        let b = v.to_le_bytes();
        self.write_raw(&b[0..3])
    }

    pub fn write_u32be(&mut self, v: u32) -> Result<()> {
        self.write_raw(&v.to_be_bytes())
    }

    pub fn write_u32le(&mut self, v: u32) -> Result<()> {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_i32be(&mut self, v: i32) -> Result<()> {
        self.write_raw(&v.to_be_bytes())
    }

    pub fn write_i32le(&mut self, v: i32) -> Result<()> {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_u64be(&mut self, v: u64) -> Result<()> {
        self.write_raw(&v.to_be_bytes())
    }

    pub fn write_u64le(&mut self, v: u64) -> Result<()> {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_i64be(&mut self, v: i64) -> Result<()> {
        self.write_raw(&v.to_be_bytes())
    }

    pub fn write_i64le(&mut self, v: i64) -> Result<()> {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_f32be(&mut self, v: f32) -> Result<()> {
        self.write_raw(&v.to_be_bytes())
    }

    pub fn write_f32le(&mut self, v: f32) -> Result<()> {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_f64be(&mut self, v: f64) -> Result<()> {
        self.write_raw(&v.to_be_bytes())
    }

    pub fn write_f64le(&mut self, v: f64) -> Result<()> {
        self.write_raw(&v.to_le_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_raw(bytes)
    }

    pub fn padding(&mut self, n: usize, byte: u8) -> Result<()> {
        self.write_raw(&vec![byte; n])
    }

    /// Writes a FourCC: the 4-character tag, space-padded if short, truncated if long.
    pub fn four_cc(&mut self, tag: &str) -> Result<()> {
        let mut bytes = [b' '; 4];
        for (dst, src) in bytes.iter_mut().zip(tag.as_bytes().iter().take(4)) {
            *dst = *src;
        }
        self.write_raw(&bytes)
    }

    /// Writes a 32-bit syncsafe integer (mirror of [`crate::io::Reader::syncsafe_int`]).
    pub fn syncsafe_int(&mut self, v: u32) -> Result<()> {
        let bytes = [
            ((v >> 21) & 0x7f) as u8,
            ((v >> 14) & 0x7f) as u8,
            ((v >> 7) & 0x7f) as u8,
            (v & 0x7f) as u8,
        ];
        self.write_raw(&bytes)
    }

    /// Flushes any deferred fragments and returns the complete assembled output for `Buffer`
    /// targets. For `File`/`Stream` targets the data has already reached its destination; an
    /// empty vector is returned.
    pub fn close(mut self) -> Result<Vec<u8>> {
        match &mut self.backend {
            Backend::Deferred(buf) => Ok(std::mem::take(buf)),
            Backend::File { file, .. } => {
                if let Some(file) = file.as_mut() {
                    file.flush()?;
                }
                Ok(Vec::new())
            }
            Backend::Stream(sink) => {
                let _ = sink;
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Reader;
    use std::sync::Arc;

    #[test]
    fn typed_pairs_round_trip() {
        let mut w = Writer::open(Target::Buffer);
        w.write_u8(0xab).unwrap();
        w.write_i8(-5).unwrap();
        w.write_u16be(0x1234).unwrap();
        w.write_u16le(0x1234).unwrap();
        w.write_i16be(-1).unwrap();
        w.write_i16le(-1).unwrap();
        w.write_u24be(0x00abcd).unwrap();
        w.write_u24le(0x00abcd).unwrap();
        w.write_u32be(0xdeadbeef).unwrap();
        w.write_u32le(0xdeadbeef).unwrap();
        w.write_i32be(-1).unwrap();
        w.write_i32le(-1).unwrap();
        w.write_u64be(0x0102030405060708).unwrap();
        w.write_u64le(0x0102030405060708).unwrap();
        w.write_i64be(-1).unwrap();
        w.write_i64le(-1).unwrap();
        w.write_f32be(1.5).unwrap();
        w.write_f32le(1.5).unwrap();
        w.write_f64be(2.5).unwrap();
        w.write_f64le(2.5).unwrap();
        w.four_cc("fLaC").unwrap();
        w.four_cc("Hi").unwrap();
        w.syncsafe_int(0x00201).unwrap();
        let bytes = w.close().unwrap();

        let mut r = Reader::from_buffer(Arc::from(bytes.into_boxed_slice()));
        assert_eq!(r.read_u8().unwrap(), 0xab);
        assert_eq!(r.read_i8().unwrap(), -5);
        assert_eq!(r.read_u16be().unwrap(), 0x1234);
        assert_eq!(r.read_u16le().unwrap(), 0x1234);
        assert_eq!(r.read_i16be().unwrap(), -1);
        assert_eq!(r.read_i16le().unwrap(), -1);
        assert_eq!(r.read_u24be().unwrap(), 0x00abcd);
        assert_eq!(r.read_u24le().unwrap(), 0x00abcd);
        assert_eq!(r.read_u32be().unwrap(), 0xdeadbeef);
        assert_eq!(r.read_u32le().unwrap(), 0xdeadbeef);
        assert_eq!(r.read_i32be().unwrap(), -1);
        assert_eq!(r.read_i32le().unwrap(), -1);
        assert_eq!(r.read_u64be().unwrap(), 0x0102030405060708);
        assert_eq!(r.read_u64le().unwrap(), 0x0102030405060708);
        assert_eq!(r.read_i64be().unwrap(), -1);
        assert_eq!(r.read_i64le().unwrap(), -1);
        assert_eq!(r.read_f32be().unwrap(), 1.5);
        assert_eq!(r.read_f32le().unwrap(), 1.5);
        assert_eq!(r.read_f64be().unwrap(), 2.5);
        assert_eq!(r.read_f64le().unwrap(), 2.5);
        assert_eq!(r.four_cc().unwrap(), *b"fLaC");
        assert_eq!(r.four_cc().unwrap(), *b"Hi  ");
        assert_eq!(r.syncsafe_int().unwrap(), 0x00201);
    }

    #[test]
    fn padding_writes_requested_byte() {
        let mut w = Writer::open(Target::Buffer);
        w.padding(3, 0).unwrap();
        assert_eq!(w.close().unwrap(), vec![0, 0, 0]);
    }
}
