//! Error types for RF control message framing and parsing

use thiserror::Error;

/// Errors that can occur while splitting or parsing incoming data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A frame grew past the configured limit before its terminator arrived
    #[error("frame too long: {len} bytes exceeds limit of {max}")]
    FrameTooLong { len: usize, max: usize },

    /// Frame bytes are not valid UTF-8
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// Unknown unit suffix in a value string
    #[error("invalid unit: {0}")]
    InvalidUnit(String),

    /// Numeric part of a value string could not be parsed
    #[error("invalid number: {0}")]
    InvalidNumber(String),
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Frame was well-formed text but not a valid message
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Message could not be encoded
    #[error("encode failed: {0}")]
    Encode(String),
}
