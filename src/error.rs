//! Error types for the WebSocket client handshake.
//!
//! Every failure is terminal for the handshake attempt it occurred in. The
//! caller decides whether to retry with a fresh attempt or give up on the
//! transport.

use thiserror::Error;

/// Result type alias for handshake operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while performing the opening handshake.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The entropy source could not produce the challenge nonce.
    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// Sending the request bytes to the transport failed.
    #[error("Transport write failed ({kind:?}): {message}")]
    TransportWrite {
        /// Error kind reported by the transport.
        kind: std::io::ErrorKind,
        /// Transport error message.
        message: String,
    },

    /// No complete HTTP response could be read from the transport.
    #[error("Transport read failed ({kind:?}): {message}")]
    TransportRead {
        /// Error kind reported by the transport, or `InvalidData` for a
        /// malformed response head.
        kind: std::io::ErrorKind,
        /// Transport or parser error message.
        message: String,
    },

    /// The response was read but failed one of the acceptance checks.
    #[error("Bad handshake: {0}")]
    BadHandshake(String),

    /// The response head exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes buffered so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Establishing the transport for [`connect_async`](crate::connect_async) failed.
    #[error("Dial failed ({kind:?}): {message}")]
    Dial {
        /// Error kind reported by the socket layer.
        kind: std::io::ErrorKind,
        /// Socket error message.
        message: String,
    },

    /// The target URL cannot be used for a WebSocket handshake.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A caller-supplied header would corrupt the request.
    #[error("Invalid header {header}: {reason}")]
    InvalidHeaderValue {
        /// Header name as supplied.
        header: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl Error {
    pub(crate) fn write(err: &std::io::Error) -> Self {
        Error::TransportWrite {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub(crate) fn read(err: &std::io::Error) -> Self {
        Error::TransportRead {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Returns `true` if the server's response was rejected by validation.
    #[must_use]
    pub fn is_bad_handshake(&self) -> bool {
        matches!(self, Error::BadHandshake(_))
    }
}

impl From<httparse::Error> for Error {
    fn from(err: httparse::Error) -> Self {
        Error::TransportRead {
            kind: std::io::ErrorKind::InvalidData,
            message: format!("malformed HTTP response: {err}"),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}
