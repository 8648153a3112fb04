use std::io::ErrorKind;
use std::time::Duration;

use crate::origin::Origin;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("malformed address `{input}`: {reason}")]
    MalformedAddress { input: String, reason: String },

    #[error("connection to {target} failed: {source}")]
    ConnectionFailure {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// The server answered with a status outside the 2xx class.
    #[error("HTTP request failed with status {code}: [{status_text}]")]
    ProtocolStatusError { code: u16, status_text: String },

    #[error("request targets {actual} but the connection is bound to {expected}")]
    ServerMismatch { expected: Origin, actual: Origin },

    #[error("response body truncated: expected {expected} bytes, received {received}")]
    TruncatedRead { expected: u64, received: u64 },

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[error("invalid byte range {start}-{end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        operation: &'static str,
        duration: Duration,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl HttpError {
    pub fn malformed_address(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAddress {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn connection_failure(target: impl Into<String>, source: std::io::Error) -> Self {
        Self::ConnectionFailure {
            target: target.into(),
            source,
        }
    }

    /// Connection closed by the peer (or never opened) before a full response arrived.
    pub fn connection_closed(target: impl Into<String>, detail: &str) -> Self {
        Self::connection_failure(
            target,
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, detail.to_string()),
        )
    }

    /// Wraps an I/O error raised mid-exchange. A lost connection is a
    /// [`HttpError::ConnectionFailure`]; anything else stays [`HttpError::Io`].
    pub fn from_io(target: impl Into<String>, source: std::io::Error) -> Self {
        if is_connection_loss(source.kind()) {
            Self::connection_failure(target, source)
        } else {
            Self::Io { source }
        }
    }

    pub fn malformed_response(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    pub fn timeout(operation: &'static str, duration: Duration) -> Self {
        Self::Timeout {
            operation,
            duration,
        }
    }

    /// Whether the error leaves a persistent connection in an unknown state.
    ///
    /// Address, range and origin errors are raised before any byte hits the socket.
    /// Everything else happens mid-exchange, with the rest of the response unread.
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            Self::MalformedAddress { .. }
            | Self::ServerMismatch { .. }
            | Self::InvalidRange { .. } => false,
            Self::ProtocolStatusError { .. }
            | Self::ConnectionFailure { .. }
            | Self::TruncatedRead { .. }
            | Self::MalformedResponse { .. }
            | Self::Timeout { .. }
            | Self::Io { .. } => true,
        }
    }
}

fn is_connection_loss(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}
