use std::io::ErrorKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Reading from the raw source failed.")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid transcoder state: {0}")]
    InvalidState(&'static str),

    #[error(
        "Source ended inside a character: {pending} of {bytes_per_character} bytes left undecoded at offset {position}."
    )]
    IncompleteTrailingCharacter {
        pending: usize,
        bytes_per_character: usize,
        position: u64,
    },

    #[error("Unknown or variable-width charset: '{0}'")]
    UnknownCharset(String),
}

impl Error {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(e) => e.kind(),
            Error::InvalidConfiguration(_) | Error::UnknownCharset(_) => ErrorKind::InvalidInput,
            Error::InvalidState(_) => ErrorKind::Other,
            Error::IncompleteTrailingCharacter { .. } => ErrorKind::UnexpectedEof,
        }
    }

    /// Converts into an `io::Error`, passing raw source failures through untouched.
    pub fn into_io_error(self) -> std::io::Error {
        match self {
            Error::Io(e) => e,
            other => std::io::Error::new(other.kind(), other),
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        err.into_io_error()
    }
}
