use thiserror::Error;

use crate::protocol::chain::{ChainedError, RemoteError};

#[derive(Error, Debug)]
pub enum RemcallError {
    /// The remote handler failed and reported a structured error.
    #[error(transparent)]
    RemoteCallFailed(#[from] ChainedError),

    #[error("Remote error response: {status}: {body}")]
    ErrorResponse { status: u16, body: String },

    #[error("Remote not found: {0}")]
    RemoteNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemcallError {
    /// Returns the reconstructed remote failure, if this error carries one.
    pub fn remote_cause(&self) -> Option<&RemoteError> {
        match self {
            RemcallError::RemoteCallFailed(chained) => chained.cause(),
            _ => None,
        }
    }
}

impl From<hyper::Error> for RemcallError {
    fn from(err: hyper::Error) -> Self {
        RemcallError::Transport(err.to_string())
    }
}

impl From<http::Error> for RemcallError {
    fn from(err: http::Error) -> Self {
        RemcallError::InvalidArgument(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for RemcallError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        RemcallError::InvalidArgument(format!("invalid header name: {}", err))
    }
}

impl From<http::header::InvalidHeaderValue> for RemcallError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        RemcallError::InvalidArgument(format!("invalid header value: {}", err))
    }
}

impl From<http::uri::InvalidUri> for RemcallError {
    fn from(err: http::uri::InvalidUri) -> Self {
        RemcallError::InvalidArgument(format!("invalid uri: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, RemcallError>;
