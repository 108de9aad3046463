//! Codec errors

use thiserror::Error;

/// Errors raised while encoding or decoding wire structures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input is truncated, over-long, carries trailing garbage, or holds an
    /// invalid discriminator
    #[error("malformed wire data: {reason}")]
    MalformedWire {
        /// What made the input unreadable
        reason: String,
    },
}

impl CodecError {
    /// Shorthand for a [`CodecError::MalformedWire`] with the given reason
    pub fn malformed(reason: impl Into<String>) -> Self {
        CodecError::MalformedWire {
            reason: reason.into(),
        }
    }
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;
