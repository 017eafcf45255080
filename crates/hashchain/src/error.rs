//! Error types for the source chain.

use hashchain_core::CoreError;
use hashchain_store::ChainError;
use thiserror::Error;

/// Errors that can occur during source chain operations.
#[derive(Debug, Error)]
pub enum SourceChainError {
    /// Chain store error.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Core primitive error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Export rendering error.
    #[error("export error: {0}")]
    Export(#[from] serde_json::Error),

    /// Text rendering error.
    #[error("format error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Invalid operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type for source chain operations.
pub type Result<T> = std::result::Result<T, SourceChainError>;
