//! Error types for the control server and client

use thiserror::Error;

/// Errors that can occur while serving or calling the control service
///
/// Device-level failures never appear here; the request handler reports
/// those inside the response body.
#[derive(Debug, Error)]
pub enum ControlError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Protocol error
    #[error("protocol error: {0}")]
    ProtocolError(#[from] rf_protocol::ProtocolError),

    /// Listener could not be bound
    #[error("failed to bind {addr}: {reason}")]
    BindFailed { addr: String, reason: String },

    /// Peer closed the connection
    #[error("connection closed")]
    ConnectionClosed,

    /// Response did not answer the outstanding request
    #[error("response id mismatch: expected {expected}, got {actual:?}")]
    ResponseIdMismatch { expected: u64, actual: Option<u64> },

    /// Server rejected the request frame
    #[error("server error: {0}")]
    Remote(String),

    /// Response body did not match the request kind
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
