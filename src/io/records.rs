//! Big-endian Fortran record access.
//!
//! OTIS-family binary files are sequences of Fortran unformatted records:
//! a 4-byte big-endian length marker, the payload, and the same marker
//! again. Instead of implicit `seek` bookkeeping, readers here use named
//! field reads plus explicit marker assertions, so format drift fails fast
//! as a decode error instead of silently misaligning.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, TideModelError};

/// Cursor over a big-endian record-structured stream.
pub struct RecordReader<R: Read + Seek> {
    inner: R,
}

impl<R: Read + Seek> RecordReader<R> {
    /// Wrap a readable, seekable stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Current byte offset from the start of the stream.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Total stream length in bytes.
    pub fn stream_len(&mut self) -> Result<u64> {
        let pos = self.inner.stream_position()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }

    fn decode_err(&mut self, message: impl Into<String>) -> TideModelError {
        let offset = self.inner.stream_position().unwrap_or(0);
        TideModelError::Decode {
            offset,
            message: message.into(),
        }
    }

    /// Read one big-endian 4-byte integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        match self.inner.read_i32::<BigEndian>() {
            Ok(v) => Ok(v),
            Err(_) => Err(self.decode_err("unexpected end of file reading i32")),
        }
    }

    /// Read one big-endian 4-byte float.
    pub fn read_f32(&mut self) -> Result<f32> {
        match self.inner.read_f32::<BigEndian>() {
            Ok(v) => Ok(v),
            Err(_) => Err(self.decode_err("unexpected end of file reading f32")),
        }
    }

    /// Read `n` big-endian 4-byte integers.
    pub fn read_i32_vec(&mut self, n: usize) -> Result<Vec<i32>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_i32()?);
        }
        Ok(out)
    }

    /// Read `n` big-endian 4-byte floats.
    pub fn read_f32_vec(&mut self, n: usize) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read_f32()?);
        }
        Ok(out)
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        if self.inner.read_exact(&mut buf).is_err() {
            return Err(self.decode_err(format!("unexpected end of file reading {} bytes", n)));
        }
        Ok(buf)
    }

    /// Skip `n` bytes forward (or backward if negative).
    pub fn skip(&mut self, n: i64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(n))?;
        Ok(())
    }

    /// Read a record-length marker without checking its value.
    pub fn read_marker(&mut self) -> Result<i32> {
        self.read_i32()
    }

    /// Read a record-length marker and verify it.
    pub fn expect_marker(&mut self, expected: i32) -> Result<()> {
        let found = self.read_i32()?;
        if found != expected {
            return Err(self.decode_err(format!(
                "record marker mismatch: expected {}, found {}",
                expected, found
            )));
        }
        Ok(())
    }
}

/// Writer for big-endian record-structured streams.
pub struct RecordWriter<W: Write> {
    inner: W,
}

impl<W: Write> RecordWriter<W> {
    /// Wrap a writable stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one big-endian 4-byte integer.
    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.inner.write_i32::<BigEndian>(v)?;
        Ok(())
    }

    /// Write one big-endian 4-byte float.
    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.inner.write_f32::<BigEndian>(v)?;
        Ok(())
    }

    /// Write a slice of big-endian 4-byte floats.
    pub fn write_f32_slice(&mut self, vs: &[f32]) -> Result<()> {
        for &v in vs {
            self.write_f32(v)?;
        }
        Ok(())
    }

    /// Write a slice of big-endian 4-byte integers.
    pub fn write_i32_slice(&mut self, vs: &[i32]) -> Result<()> {
        for &v in vs {
            self.write_i32(v)?;
        }
        Ok(())
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write a record-length marker.
    pub fn write_marker(&mut self, len: i32) -> Result<()> {
        self.write_i32(len)
    }
}
