use thiserror::Error;

use crate::protocol::response::ErrPayload;

pub use color_eyre::eyre::eyre;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ErrPayload),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Unexpected end of packet")]
    UnexpectedEof,

    /// A previous write or read failure left the connection unusable
    #[error("Connection is broken and cannot issue commands")]
    ConnectionBroken,

    /// Rows of an earlier query were not drained before issuing a new command
    #[error("A previous result set has not been fully read; call discard_pending() first")]
    ResultSetPending,

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Cannot parse integer: {0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("Cannot parse float: {0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("Float out of range: {0:?}")]
    FloatOutOfRange(String),

    #[error("Cannot parse bool from {0:?}")]
    ParseBoolError(String),

    #[error("Invalid UTF-8: {0}")]
    Utf8Error(#[from] simdutf8::basic::Utf8Error),

    #[error("Library bug: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    /// Whether the error leaves the connection usable for further commands.
    ///
    /// Server-reported errors and value coercion failures do not affect the stream.
    pub fn is_conn_broken(&self) -> bool {
        !matches!(
            self,
            Error::ServerError(_)
                | Error::ResultSetPending
                | Error::BadConfigError(_)
                | Error::BadUsageError(_)
                | Error::ParseIntError(_)
                | Error::ParseFloatError(_)
                | Error::FloatOutOfRange(_)
                | Error::ParseBoolError(_)
                | Error::Utf8Error(_)
        )
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

pub type Result<T> = std::result::Result<T, Error>;
