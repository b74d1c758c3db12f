//! Classification of non-OK gRPC statuses.

use tonic::{Code, Status};

/// Who a failed RPC should be blamed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// The exchange itself failed (channel down, deadline hit, stream broken).
    Transport,
    /// The service answered with an application-level status.
    Rpc,
}

/// Classify a status returned by a unary call.
///
/// `Unavailable`, `DeadlineExceeded`, `Cancelled`, `Unknown`, `Internal` and
/// `DataLoss` are produced by the channel as often as by the server and are
/// treated as transport failures. Everything else is the server's answer.
#[must_use]
pub fn classify(status: &Status) -> StatusClass {
    match status.code() {
        Code::Unavailable
        | Code::DeadlineExceeded
        | Code::Cancelled
        | Code::Unknown
        | Code::Internal
        | Code::DataLoss => StatusClass::Transport,
        _ => StatusClass::Rpc,
    }
}
