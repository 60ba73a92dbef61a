//! Seekable access to forward-only, chunked byte streams.
//!
//! A [`ChunkSource`] hands out the chunks of a body one at a time and can
//! not go back. [`ResponseStream`] buffers what it pulls and exposes the
//! usual `read`/`seek`/`tell` operations on top, pulling more chunks only
//! when a request reaches past what is already buffered. It also
//! implements [`std::io::Read`], [`std::io::BufRead`] and
//! [`std::io::Seek`].
//!
//! The [`http`] module feeds it from `reqwest` response bodies.

pub mod config;
mod errors;
pub mod http;
pub mod source;
pub mod stream;

pub use config::{Config, SessionConfig, StreamConfig};
pub use errors::{Error, Result, StreamError};
pub use source::{ChunkSource, IterSource, Pull, ReaderSource, TryIterSource};
pub use stream::{ResponseStream, Whence};
