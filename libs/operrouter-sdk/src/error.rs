//! Error type shared by every OperRouter client.
//!
//! Failures come in two tiers. Transport failures mean the exchange with the
//! backend did not produce a usable answer. Misuse failures are detected
//! locally before anything is sent. A backend that answers "no" is not an
//! error at all: the response carries `success == false` and a message.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One of the three client realizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// JSON-RPC over HTTP
    #[default]
    Http,
    /// gRPC/Protobuf
    Grpc,
    /// Dynamically loaded native library
    Ffi,
}

impl TransportKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Grpc => "grpc",
            Self::Ffi => "ffi",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = OperRouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" | "jsonrpc" => Ok(Self::Http),
            "grpc" => Ok(Self::Grpc),
            "ffi" | "native" => Ok(Self::Ffi),
            other => Err(OperRouterError::Configuration(format!(
                "unknown transport `{other}` (expected http, grpc or ffi)"
            ))),
        }
    }
}

/// Error tier, for callers that branch on "retry later" vs "fix the call".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Misuse,
}

/// Error returned by [`crate::OperRouterClientV1`] operations.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum OperRouterError {
    /// Connection refused, reset, non-2xx HTTP status, null native reply.
    #[error("{transport} transport error: {message}")]
    Transport {
        transport: TransportKind,
        message: String,
    },

    #[error("{transport} call timed out after {after:?}")]
    Timeout {
        transport: TransportKind,
        after: Duration,
    },

    /// The reply arrived but could not be decoded into the expected shape.
    #[error("malformed {transport} response: {message}")]
    MalformedResponse {
        transport: TransportKind,
        message: String,
    },

    /// Protocol-level error object (JSON-RPC `error`, non-OK gRPC status).
    #[error("{transport} rpc error {code}: {message}")]
    Rpc {
        transport: TransportKind,
        code: i64,
        message: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The client was closed and can no longer be used.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("native library not found (tried: {})", .candidates.join(", "))]
    LibraryNotFound { candidates: Vec<String> },

    #[error("symbol `{symbol}` not found: {message}")]
    SymbolNotFound { symbol: String, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl OperRouterError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::MalformedResponse { .. }
            | Self::Rpc { .. } => ErrorKind::Transport,
            Self::InvalidArgument(_)
            | Self::ConnectionClosed
            | Self::LibraryNotFound { .. }
            | Self::SymbolNotFound { .. }
            | Self::Configuration(_) => ErrorKind::Misuse,
        }
    }

    pub(crate) fn transport(transport: TransportKind, message: impl Into<String>) -> Self {
        Self::Transport {
            transport,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(transport: TransportKind, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            transport,
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
