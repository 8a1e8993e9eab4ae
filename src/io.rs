//! Byte sinks and sources.
//!
//! The coder never touches a stream directly: the encoder pushes bytes into a
//! [`ByteSink`] and the decoder pulls them from a [`ByteSource`]. In-memory
//! buffers are the common case, adapters for `std::io` are provided for the
//! rest.

use std::io::{ErrorKind, Read, Write};

use crate::error::Result;

/// Destination for encoded bytes.
pub trait ByteSink {
    /// Append one byte.
    fn put(&mut self, byte: u8) -> Result<()>;

    /// Append `count` copies of `byte`.
    fn put_run(&mut self, byte: u8, count: u64) -> Result<()> {
        for _ in 0..count {
            self.put(byte)?;
        }
        Ok(())
    }
}

/// Source of encoded bytes.
pub trait ByteSource {
    /// Next byte, or `None` once the source is exhausted.
    fn next_byte(&mut self) -> Result<Option<u8>>;
}

impl ByteSink for Vec<u8> {
    #[inline]
    fn put(&mut self, byte: u8) -> Result<()> {
        self.push(byte);
        Ok(())
    }

    fn put_run(&mut self, byte: u8, count: u64) -> Result<()> {
        self.extend(std::iter::repeat(byte).take(count as usize));
        Ok(())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    #[inline]
    fn put(&mut self, byte: u8) -> Result<()> {
        (**self).put(byte)
    }

    fn put_run(&mut self, byte: u8, count: u64) -> Result<()> {
        (**self).put_run(byte, count)
    }
}

impl ByteSource for std::vec::IntoIter<u8> {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.next())
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>> {
        (**self).next_byte()
    }
}

/// Reads from a borrowed byte slice.
#[derive(Clone, Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

impl ByteSource for SliceSource<'_> {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.data.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }
}

/// Adapts any [`std::io::Write`] into a [`ByteSink`].
///
/// Every byte is a separate `write_all`; wrap files in a `BufWriter`.
#[derive(Debug)]
pub struct WriteSink<W: Write> {
    inner: W,
}

impl<W: Write> WriteSink<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for WriteSink<W> {
    fn put(&mut self, byte: u8) -> Result<()> {
        self.inner.write_all(&[byte])?;
        Ok(())
    }
}

/// Adapts any [`std::io::Read`] into a [`ByteSource`].
#[derive(Debug)]
pub struct ReadSource<R: Read> {
    inner: R,
}

impl<R: Read> ReadSource<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Recover the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
