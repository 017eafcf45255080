//! Source chain configuration.

use std::path::PathBuf;

use hashchain_core::HashSpec;
use serde::{Deserialize, Serialize};

/// Configuration for a [`SourceChain`](crate::SourceChain).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Hash algorithm and encoding for all content hashing.
    pub hash_spec: HashSpec,
    /// Live append log. `None` keeps the chain in memory only.
    pub path: Option<PathBuf>,
    /// Whether to validate a replayed chain before handing it out.
    pub validate_on_open: bool,
}

impl ChainConfig {
    /// In-memory chain with default settings.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed chain at `path` with default settings.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_hash_spec(mut self, hash_spec: HashSpec) -> Self {
        self.hash_spec = hash_spec;
        self
    }

    pub fn with_validate_on_open(mut self, validate: bool) -> Self {
        self.validate_on_open = validate;
        self
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            hash_spec: HashSpec::default(),
            path: None,
            validate_on_open: true,
        }
    }
}
