//! Error types for rangefetch
//!
//! Every failure a download can end with maps onto one of the variants below.
//! Chunk-level failures carry the sequence index of the chunk that produced
//! them so the caller can tell which range broke the batch.

use std::fmt;

/// Boxed underlying cause of a transport failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for rangefetch operations
#[derive(Debug)]
pub enum Error {
    /// Malformed or unsupported URL, rejected before any I/O
    UrlError(String),

    /// Non-success HTTP status or unusable headers while probing
    RemoteError(String),

    /// Transport or body failure for one chunk or the single-stream body
    FetchError {
        /// Sequence index of the failing chunk, `None` for the single stream
        chunk: Option<u32>,
        source: BoxError,
    },

    /// Local storage open/write/delete failure
    SinkError(std::io::Error),

    /// Failure while reassembling chunks into the destination
    MergeError(std::io::Error),

    /// Internal consistency violation (gap or duplicate in the merge sequence)
    InvariantError(String),
}

impl Error {
    /// Builds a fetch error for the given chunk from any error-like cause
    pub fn fetch(chunk: Option<u32>, source: impl Into<BoxError>) -> Self {
        Error::FetchError {
            chunk,
            source: source.into(),
        }
    }

    /// Sequence index of the chunk that failed, if the error is chunk-scoped
    pub fn chunk(&self) -> Option<u32> {
        match self {
            Error::FetchError { chunk, .. } => *chunk,
            _ => None,
        }
    }

    /// Attaches a chunk index to a fetch error that does not carry one yet
    pub(crate) fn in_chunk(self, index: u32) -> Self {
        match self {
            Error::FetchError { chunk: None, source } => Error::FetchError {
                chunk: Some(index),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UrlError(msg) => {
                write!(f, "Invalid URL: {}", msg)
            }
            Error::RemoteError(msg) => {
                write!(f, "Remote error: {}", msg)
            }
            Error::FetchError {
                chunk: Some(index),
                source,
            } => {
                write!(f, "Fetch failed for chunk {}: {}", index, source)
            }
            Error::FetchError { chunk: None, source } => {
                write!(f, "Fetch failed: {}", source)
            }
            Error::SinkError(err) => {
                write!(f, "Storage error: {}", err)
            }
            Error::MergeError(err) => {
                write!(f, "Merge failed: {}", err)
            }
            Error::InvariantError(msg) => {
                write!(f, "Internal invariant violated: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FetchError { source, .. } => Some(source.as_ref()),
            Error::SinkError(err) | Error::MergeError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::SinkError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Error::UrlError(err.to_string())
        } else {
            Error::fetch(None, err)
        }
    }
}

/// Convenience result type for rangefetch operations
pub type Result<T> = std::result::Result<T, Error>;
