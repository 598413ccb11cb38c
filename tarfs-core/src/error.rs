use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TarfsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("invalid seek whence: {0}")]
    InvalidSeekWhence(i32),

    #[error("negative position: {0}")]
    NegativePosition(i64),

    /// The stream ended before the requested number of bytes was skipped.
    #[error("failed to discard {requested} bytes: stream ended after {discarded}")]
    ShortDiscard { requested: u64, discarded: u64 },

    /// No entries remain in a directory listing. Terminal, not a fault.
    #[error("end of directory listing")]
    EndOfListing,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("policy violation: {0}")]
    Policy(String),
}

impl TarfsError {
    pub fn is_end_of_listing(&self) -> bool {
        matches!(self, TarfsError::EndOfListing)
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        TarfsError::Format(msg.into())
    }
}

/// Underlying I/O errors pass through untouched; every other kind is wrapped
/// so callers of the `std::io` traits can downcast back to `TarfsError`.
impl From<TarfsError> for io::Error {
    fn from(e: TarfsError) -> Self {
        let kind = match e {
            TarfsError::Io(inner) => return inner,
            TarfsError::Format(_) => io::ErrorKind::InvalidData,
            TarfsError::InvalidSeekWhence(_) | TarfsError::NegativePosition(_) => {
                io::ErrorKind::InvalidInput
            }
            TarfsError::ShortDiscard { .. } | TarfsError::EndOfListing => {
                io::ErrorKind::UnexpectedEof
            }
            TarfsError::NotFound(_) => io::ErrorKind::NotFound,
            TarfsError::NotADirectory(_) => io::ErrorKind::NotADirectory,
            TarfsError::IsADirectory(_) => io::ErrorKind::IsADirectory,
            TarfsError::InvalidPath(_) => io::ErrorKind::InvalidInput,
            TarfsError::Policy(_) => io::ErrorKind::PermissionDenied,
        };
        io::Error::new(kind, e)
    }
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, TarfsError>;
