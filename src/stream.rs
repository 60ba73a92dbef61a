//! Seekable view over a forward-only [`ChunkSource`].
//!
//! [`ResponseStream`] keeps every byte it has pulled in an append-only
//! buffer, so any region read once can be read again without going back
//! to the source. The source is only consulted when a request reaches past
//! the buffered end:
//!
//! - `read(Some(n))` pulls until `cursor + n` bytes are buffered;
//! - `read(None)` and `seek(_, Whence::End)` pull until exhaustion;
//! - `seek(_, Whence::Start | Whence::Current)` and `tell()` never pull.
//!
//! ```
//! use response_stream::{IterSource, ResponseStream, Whence};
//!
//! let source = IterSource::new(vec![&b"hello"[..], &b"world"[..]]);
//! let mut stream = ResponseStream::new(source);
//!
//! stream.seek(3, Whence::Start).unwrap();
//! assert_eq!(stream.read(Some(4)).unwrap(), &b"lowo"[..]);
//! assert_eq!(stream.tell(), 7);
//! ```

use std::fmt;
use std::io::{self, BufRead, Read, Seek, SeekFrom};

use bytes::Bytes;

use crate::config::StreamConfig;
use crate::errors::StreamError;
use crate::source::{ChunkSource, Pull, ReaderSource};

/// Reference point of a [`ResponseStream::seek`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Whence {
    #[default]
    Start,
    Current,
    End,
}

impl Whence {
    /// Decode the conventional numeric whence (0, 1, 2).
    pub fn from_raw(whence: i32) -> Option<Self> {
        match whence {
            0 => Some(Self::Start),
            1 => Some(Self::Current),
            2 => Some(Self::End),
            _ => None,
        }
    }
}

pub struct ResponseStream<S> {
    source: S,
    buffer: Vec<u8>,
    cursor: u64,
    exhausted: bool,
}

impl<S: ChunkSource> ResponseStream<S> {
    /// Wrap `source`. Nothing is pulled until the first read or seek
    /// that needs it.
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            cursor: 0,
            exhausted: false,
        }
    }

    pub fn with_config(source: S, config: &StreamConfig) -> Self {
        Self {
            source,
            buffer: Vec::with_capacity(config.initial_capacity),
            cursor: 0,
            exhausted: false,
        }
    }

    /// Read up to `size` bytes from the cursor, or everything up to the
    /// end of the stream when `size` is `None`.
    ///
    /// A result shorter than requested means the stream ended. The cursor
    /// advances by the length of the result.
    pub fn read(
        &mut self,
        size: Option<usize>,
    ) -> Result<Bytes, StreamError<S::Error>> {
        let end = match size {
            Some(0) => return Ok(Bytes::new()),
            Some(size) => {
                let target = self.cursor.saturating_add(size as u64);
                self.load_until(target)?;
                target.min(self.buffered_len())
            }
            None => self.load_all()?,
        };

        let range = match self.span(end) {
            Some(range) => range,
            None => return Ok(Bytes::new()),
        };
        let bytes = Bytes::copy_from_slice(&self.buffer[range]);
        self.cursor = end;
        Ok(bytes)
    }

    /// Fill `buf` from the cursor with the same pulling rules as
    /// `read(Some(buf.len()))`, returning how many bytes were copied.
    pub fn read_into(
        &mut self,
        buf: &mut [u8],
    ) -> Result<usize, StreamError<S::Error>> {
        if buf.is_empty() {
            return Ok(0);
        }

        let target = self.cursor.saturating_add(buf.len() as u64);
        self.load_until(target)?;
        let end = target.min(self.buffered_len());

        let range = match self.span(end) {
            Some(range) => range,
            None => return Ok(0),
        };
        let n = range.len();
        buf[..n].copy_from_slice(&self.buffer[range]);
        self.cursor = end;
        Ok(n)
    }

    /// Move the cursor and return its new absolute value.
    ///
    /// `Whence::End` has to pull the whole source to learn its length;
    /// the other variants never pull, even past the buffered end.
    pub fn seek(
        &mut self,
        position: i64,
        whence: Whence,
    ) -> Result<u64, StreamError<S::Error>> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.cursor,
            Whence::End => self.load_all()?,
        };

        let cursor = if position >= 0 {
            base.checked_add(position as u64)
        } else {
            base.checked_sub(position.unsigned_abs())
        }
        .ok_or_else(|| {
            StreamError::invalid_argument(format!(
                "cannot seek {} bytes from {:?} (base offset {})",
                position, whence, base
            ))
        })?;

        log::trace!(
            "Seek {} from {:?}, cursor is now {}",
            position,
            whence,
            cursor
        );
        self.cursor = cursor;
        Ok(cursor)
    }

    /// Like [`seek`](Self::seek) with a numeric whence; an unknown value
    /// is rejected before anything is pulled.
    pub fn seek_raw(
        &mut self,
        position: i64,
        whence: i32,
    ) -> Result<u64, StreamError<S::Error>> {
        let whence = Whence::from_raw(whence).ok_or_else(|| {
            StreamError::invalid_argument(format!(
                "unsupported whence {}",
                whence
            ))
        })?;
        self.seek(position, whence)
    }

    pub fn tell(&self) -> u64 {
        self.cursor
    }

    /// Pull the source to exhaustion and return the total stream length.
    pub fn load_all(&mut self) -> Result<u64, StreamError<S::Error>> {
        while self.pull_once()? {}
        Ok(self.buffered_len())
    }

    pub fn buffered_len(&self) -> u64 {
        self.buffer.len() as u64
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Every byte pulled so far, from offset 0.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn load_until(&mut self, goal: u64) -> Result<(), StreamError<S::Error>> {
        while self.buffered_len() < goal && self.pull_once()? {}
        Ok(())
    }

    /// Pull one chunk into the buffer. Returns `false` once the source is
    /// exhausted, after which the source is never asked again.
    fn pull_once(&mut self) -> Result<bool, StreamError<S::Error>> {
        if self.exhausted {
            return Ok(false);
        }

        match self.source.pull().map_err(StreamError::Source)? {
            Pull::Chunk(chunk) => {
                log::trace!(
                    "Pulled chunk of {} bytes at offset {}",
                    chunk.len(),
                    self.buffer.len()
                );
                self.buffer.extend_from_slice(&chunk);
                Ok(true)
            }
            Pull::Exhausted => {
                log::debug!(
                    "Chunk source exhausted after {} bytes",
                    self.buffer.len()
                );
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    /// Buffer range from the cursor to `end`, if non-empty.
    fn span(&self, end: u64) -> Option<std::ops::Range<usize>> {
        if self.cursor >= end {
            return None;
        }
        // end never exceeds the buffer length here
        Some(self.cursor as usize..end as usize)
    }
}

impl<R: Read> ResponseStream<ReaderSource<R>> {
    /// Seekable stream over a plain reader, chunked per `config`.
    pub fn from_reader(reader: R, config: &StreamConfig) -> Self {
        Self::with_config(
            ReaderSource::with_chunk_size(reader, config.read_chunk_size),
            config,
        )
    }
}

impl<S> fmt::Debug for ResponseStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseStream")
            .field("cursor", &self.cursor)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl<S> Read for ResponseStream<S>
where
    S: ChunkSource,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }

    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let bytes = ResponseStream::read(self, None)?;
        buf.extend_from_slice(&bytes);
        Ok(bytes.len())
    }
}

impl<S> BufRead for ResponseStream<S>
where
    S: ChunkSource,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let goal = self.cursor.saturating_add(1);
        self.load_until(goal)?;

        let end = self.buffered_len();
        Ok(match self.span(end) {
            Some(range) => &self.buffer[range],
            None => &[],
        })
    }

    fn consume(&mut self, amt: usize) {
        let end = self.buffered_len().max(self.cursor);
        self.cursor = self.cursor.saturating_add(amt as u64).min(end);
    }
}

impl<S> Seek for ResponseStream<S>
where
    S: ChunkSource,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let cursor = match pos {
            SeekFrom::Start(offset) => {
                self.cursor = offset;
                offset
            }
            SeekFrom::Current(offset) => {
                ResponseStream::seek(self, offset, Whence::Current)?
            }
            SeekFrom::End(offset) => {
                ResponseStream::seek(self, offset, Whence::End)?
            }
        };
        Ok(cursor)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.tell())
    }
}
