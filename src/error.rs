use std::fmt;
use std::io;

use thiserror::Error;

/// Every way ingesting a single request can fail.
///
/// None of these ever leave the connection that produced them: the handler
/// logs the failure and closes the socket.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("connection closed before the end of the headers")]
    EmptyConnection,
    #[error("header exceeds {limit} bytes without a terminator ({read} read)")]
    HeaderTooLarge { read: usize, limit: usize },
    #[error("no data received within the read timeout")]
    Timeout,
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("malformed Content-Length: {0:?}")]
    MalformedContentLength(String),
    #[error("malformed multipart Content-Type: {0:?}")]
    MalformedMultipartHeader(String),
    #[error("missing Content-Type or Content-Length on a {method} request")]
    MissingBodyMetadata { method: String },
    #[error("declared body of {length} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { length: usize, limit: usize },
    #[error("connection closed after {received} of {expected} body bytes")]
    TruncatedBody { expected: usize, received: usize },
    #[error("connection error: {0}")]
    ConnectionError(#[source] io::Error),
    #[error("socket error: {0}")]
    Io(#[source] io::Error),
}

/// Stable tag for an [`IngestError`], used in logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyConnection,
    HeaderTooLarge,
    Timeout,
    MalformedRequestLine,
    MalformedContentLength,
    MalformedMultipartHeader,
    MissingBodyMetadata,
    BodyTooLarge,
    TruncatedBody,
    ConnectionError,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::EmptyConnection => ErrorKind::EmptyConnection,
            IngestError::HeaderTooLarge { .. } => ErrorKind::HeaderTooLarge,
            IngestError::Timeout => ErrorKind::Timeout,
            IngestError::MalformedRequestLine(_) => ErrorKind::MalformedRequestLine,
            IngestError::MalformedContentLength(_) => ErrorKind::MalformedContentLength,
            IngestError::MalformedMultipartHeader(_) => ErrorKind::MalformedMultipartHeader,
            IngestError::MissingBodyMetadata { .. } => ErrorKind::MissingBodyMetadata,
            IngestError::BodyTooLarge { .. } => ErrorKind::BodyTooLarge,
            IngestError::TruncatedBody { .. } => ErrorKind::TruncatedBody,
            IngestError::ConnectionError(_) => ErrorKind::ConnectionError,
            IngestError::Io(_) => ErrorKind::Io,
        }
    }
}

/*
Socket reads report timeouts as WouldBlock on unix and TimedOut on windows, so both
map to Timeout. A peer that resets or aborts mid-read becomes ConnectionError; every
other failure stays a plain Io error and is treated as unexpected.
*/
impl From<io::Error> for IngestError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => IngestError::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => IngestError::ConnectionError(err),
            _ => IngestError::Io(err),
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
