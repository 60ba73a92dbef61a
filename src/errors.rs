use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a [`ResponseStream`](crate::ResponseStream) operation.
///
/// `E` is the error type of the underlying chunk source, passed through
/// unmodified.
#[derive(Error, Debug)]
pub enum StreamError<E> {
    #[error(transparent)]
    Source(E),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl<E> StreamError<E> {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// The chunk source failure, if this is one.
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::Source(e) => Some(e),
            Self::InvalidArgument(_) => None,
        }
    }
}

impl<E> From<StreamError<E>> for io::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: StreamError<E>) -> Self {
        match e {
            StreamError::Source(e) => io::Error::new(io::ErrorKind::Other, e),
            StreamError::InvalidArgument(msg) => {
                io::Error::new(io::ErrorKind::InvalidInput, msg)
            }
        }
    }
}

/// Errors of the configuration layer and the HTTP glue.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<StreamError<reqwest::Error>> for Error {
    fn from(e: StreamError<reqwest::Error>) -> Self {
        match e {
            StreamError::Source(e) => Self::Http(e),
            StreamError::InvalidArgument(msg) => {
                Self::InvalidArgument(msg)
            }
        }
    }
}
