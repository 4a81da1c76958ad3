//! Error taxonomy for everything that talks to the tracking service.
//!
//! Local operations (filter edits, page clamping) never fail; only network
//! round trips and export transfers produce a [`ClientError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response was received (connection refused, DNS, dropped socket, timeout)
    Unreachable,
    /// The service answered with a non-2xx status
    ServerRejected { status: u16 },
    /// The body did not match the expected shape
    MalformedResponse,
    /// An export transfer failed after it started
    ExportAborted,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Unreachable => write!(f, "service unreachable"),
            ErrorKind::ServerRejected { status } => {
                write!(f, "server rejected request ({})", status)
            }
            ErrorKind::MalformedResponse => write!(f, "malformed response"),
            ErrorKind::ExportAborted => write!(f, "export aborted"),
        }
    }
}

/// Failure of a single network-facing operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Service unreachable: {0}")]
    Unreachable(String),

    #[error("Server rejected request with status {status}: {detail}")]
    ServerRejected { status: u16, detail: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Export aborted: {0}")]
    ExportAborted(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Unreachable(_) => ErrorKind::Unreachable,
            ClientError::ServerRejected { status, .. } => {
                ErrorKind::ServerRejected { status: *status }
            }
            ClientError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            ClientError::ExportAborted(_) => ErrorKind::ExportAborted,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::MalformedResponse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
