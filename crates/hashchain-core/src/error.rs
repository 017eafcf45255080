//! Error types for the hash chain core.

use thiserror::Error;

/// Failure reported by a signing capability.
///
/// The core never inspects it; it is carried back to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("signing failed: {0}")]
pub struct SignError(pub String);

impl SignError {
    /// Build a signing error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Core errors that can occur while building, encoding or decoding chain data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Signing(#[from] SignError),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("malformed entry: {0}")]
    MalformedEntry(String),

    #[error("unknown entry content tag: {0:#04x}")]
    UnknownEntryTag(u8),

    #[error("invalid hash encoding: {0}")]
    InvalidHash(String),

    #[error("frame of {len} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { len: u64, limit: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// True when the stream ended part-way through a record.
    pub fn is_truncated(&self) -> bool {
        matches!(self, CoreError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
