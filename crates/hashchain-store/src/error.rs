//! Error types for the chain store.

use hashchain_core::{CoreError, Hash};
use thiserror::Error;

/// Errors that can occur during chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Lookup of a hash that was never appended.
    #[error("hash not found: {0}")]
    HashNotFound(Hash),

    /// The parallel arrays disagree in length.
    #[error("incomplete chain: {hashes} hashes, {headers} headers, {entries} entries")]
    IncompleteChain {
        hashes: usize,
        headers: usize,
        entries: usize,
    },

    /// Direct append attempted while a bundle is open.
    #[error("chain locked for bundle")]
    ChainLockedForBundle,

    #[error("no bundle started")]
    BundleNotStarted,

    #[error("bundle already started")]
    BundleAlreadyStarted,

    /// A header or entry hash is already present in the chain.
    #[error("duplicate hash: {0}")]
    DuplicateHash(Hash),

    #[error("header hash mismatch at index {index}")]
    HeaderHashMismatch { index: usize },

    #[error("entry hash mismatch at index {index}")]
    EntryHashMismatch { index: usize },

    /// A pair stream carries a format version this crate does not read.
    #[error("unsupported stream version: {0}")]
    UnsupportedVersion(u8),

    /// A core failure, with the operation and pair index it happened at.
    #[error("{op} failed at index {index}: {source}")]
    Core {
        op: &'static str,
        index: usize,
        #[source]
        source: CoreError,
    },

    #[error("I/O error during {op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The bundle's user parameter could not be serialized.
    #[error("bundle parameter error: {0}")]
    BundleParam(#[from] serde_json::Error),
}

impl ChainError {
    pub(crate) fn io(op: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| ChainError::Io { op, source }
    }

    pub(crate) fn core(op: &'static str, index: usize) -> impl FnOnce(CoreError) -> Self {
        move |source| ChainError::Core { op, index, source }
    }
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
