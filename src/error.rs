//! Error types for slice, fence and attribute operations

use thiserror::Error;

/// Main error type for vdsslice operations
#[derive(Error, Debug)]
pub enum SliceError {
    #[error("Null pointer: {0}")]
    NullPointer(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    OutOfRange(String),

    #[error("{0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification used by callers that translate errors into status
/// codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid handle or pointer
    NullPointer,
    /// User-correctable request error
    BadRequest,
    /// Environment or data error
    Runtime,
}

impl SliceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SliceError::NullPointer(_) => ErrorKind::NullPointer,
            SliceError::BadRequest(_)
            | SliceError::OutOfRange(_)
            | SliceError::Serialization(_) => ErrorKind::BadRequest,
            SliceError::Runtime(_) | SliceError::Io(_) => ErrorKind::Runtime,
        }
    }
}

/// Specialized Result type for vdsslice operations
pub type Result<T> = std::result::Result<T, SliceError>;

impl From<serde_json::Error> for SliceError {
    fn from(err: serde_json::Error) -> Self {
        SliceError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SliceError {
    fn from(err: ndarray::ShapeError) -> Self {
        SliceError::BadRequest(format!("Invalid shape: {}", err))
    }
}
