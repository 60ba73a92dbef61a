use std::convert::Infallible;
use std::io::{self, Read};
use std::iter::Fuse;

use bytes::Bytes;

use crate::config::DEFAULT_READ_CHUNK_SIZE;

/// Outcome of a single pull from a [`ChunkSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    /// The next chunk of the stream. It may be empty, which does not
    /// mean the source is done.
    Chunk(Bytes),
    /// The source has nothing more to give, now or later.
    Exhausted,
}

/// A single-pass producer of byte chunks.
///
/// Implementations must keep returning [`Pull::Exhausted`] once they
/// have returned it the first time; they never rewind nor replay chunks.
pub trait ChunkSource {
    type Error;

    /// Produce the next chunk, or report exhaustion.
    fn pull(&mut self) -> Result<Pull, Self::Error>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    type Error = S::Error;

    fn pull(&mut self) -> Result<Pull, Self::Error> {
        (**self).pull()
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    type Error = S::Error;

    fn pull(&mut self) -> Result<Pull, Self::Error> {
        (**self).pull()
    }
}

/// Chunk source over an infallible iterator of byte-like items.
pub struct IterSource<I: Iterator> {
    iter: Fuse<I>,
}

impl<I, B> IterSource<I>
where
    I: Iterator<Item = B>,
    B: Into<Bytes>,
{
    pub fn new<T>(iter: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: iter.into_iter().fuse(),
        }
    }
}

impl<I, B> ChunkSource for IterSource<I>
where
    I: Iterator<Item = B>,
    B: Into<Bytes>,
{
    type Error = Infallible;

    fn pull(&mut self) -> Result<Pull, Self::Error> {
        Ok(match self.iter.next() {
            Some(chunk) => Pull::Chunk(chunk.into()),
            None => Pull::Exhausted,
        })
    }
}

/// Chunk source over an iterator whose items may fail.
///
/// A failed item is handed to the caller as the pull error; the iterator
/// is asked again on the next pull.
pub struct TryIterSource<I: Iterator> {
    iter: Fuse<I>,
}

impl<I, B, E> TryIterSource<I>
where
    I: Iterator<Item = Result<B, E>>,
    B: Into<Bytes>,
{
    pub fn new<T>(iter: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: iter.into_iter().fuse(),
        }
    }
}

impl<I, B, E> ChunkSource for TryIterSource<I>
where
    I: Iterator<Item = Result<B, E>>,
    B: Into<Bytes>,
{
    type Error = E;

    fn pull(&mut self) -> Result<Pull, Self::Error> {
        match self.iter.next() {
            Some(chunk) => Ok(Pull::Chunk(chunk?.into())),
            None => Ok(Pull::Exhausted),
        }
    }
}

/// Chunk source cutting any [`Read`] into chunks of at most
/// `chunk_size` bytes.
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_READ_CHUNK_SIZE)
    }

    /// A zero `chunk_size` is bumped to 1.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            done: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ChunkSource for ReaderSource<R> {
    type Error = io::Error;

    fn pull(&mut self) -> Result<Pull, Self::Error> {
        if self.done {
            return Ok(Pull::Exhausted);
        }

        let mut chunk = vec![0; self.chunk_size];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.done = true;
                    return Ok(Pull::Exhausted);
                }
                Ok(n) => {
                    chunk.truncate(n);
                    return Ok(Pull::Chunk(Bytes::from(chunk)));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn iter_source_stays_exhausted() {
        let mut source = IterSource::new(vec![&b"ab"[..], &b"c"[..]]);
        assert_eq!(source.pull().unwrap(), Pull::Chunk(Bytes::from("ab")));
        assert_eq!(source.pull().unwrap(), Pull::Chunk(Bytes::from("c")));
        for _ in 0..3 {
            assert_eq!(source.pull().unwrap(), Pull::Exhausted);
        }
    }

    #[test]
    fn try_iter_source_passes_failures_through() {
        let items: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"ok".to_vec()),
            Err("broken pipe".to_owned()),
            Ok(b"again".to_vec()),
        ];
        let mut source = TryIterSource::new(items);

        assert_eq!(source.pull().unwrap(), Pull::Chunk(Bytes::from("ok")));
        assert_eq!(source.pull().unwrap_err(), "broken pipe");
        assert_eq!(source.pull().unwrap(), Pull::Chunk(Bytes::from("again")));
        assert_eq!(source.pull().unwrap(), Pull::Exhausted);
    }

    #[test]
    fn reader_source_chunks_by_size() {
        let mut source =
            ReaderSource::with_chunk_size(Cursor::new(b"abcdefg".to_vec()), 3);

        let mut chunks = vec![];
        while let Pull::Chunk(chunk) = source.pull().unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(chunks, vec!["abc", "def", "g"]);
        assert_eq!(source.pull().unwrap(), Pull::Exhausted);
    }

    #[test]
    fn reader_source_retries_interrupted_reads() {
        struct Flaky {
            interrupted: bool,
        }

        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::ErrorKind::Interrupted.into());
                }
                buf[0] = b'x';
                Ok(1)
            }
        }

        let mut source = ReaderSource::new(Flaky { interrupted: false });
        assert_eq!(source.pull().unwrap(), Pull::Chunk(Bytes::from("x")));
    }

    #[test]
    fn reader_source_zero_chunk_size() {
        let mut source =
            ReaderSource::with_chunk_size(Cursor::new(b"ab".to_vec()), 0);
        assert_eq!(source.pull().unwrap(), Pull::Chunk(Bytes::from("a")));
    }
}
