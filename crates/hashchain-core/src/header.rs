//! Header: the signed record linking an entry into the chain.
//!
//! A header is immutable once built. It commits to its entry, to the
//! previous header of the chain and to the previous header of the same type.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_header_bytes, signing_bytes};
use crate::crypto::Signature;
use crate::error::CoreError;
use crate::types::{Hash, HashSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Entry type tag.
    pub entry_type: String,

    /// Author-claimed timestamp (Unix milliseconds).
    pub timestamp: i64,

    /// `Sum` of the serialized entry.
    pub entry_link: Hash,

    /// Hash of the immediately preceding header, or null for genesis.
    pub header_link: Hash,

    /// Hash of the most recent preceding header of the same type, or null.
    pub type_link: Hash,

    /// Hash this header supersedes, for migrations and modifications.
    pub change: Option<Hash>,

    /// Signature over the header's canonical bytes minus the signature.
    pub signature: Signature,
}

impl Header {
    /// Canonical bytes, signature included.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        canonical_header_bytes(self)
    }

    /// The bytes a signer is asked to sign.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, CoreError> {
        signing_bytes(self)
    }

    /// The header's own hash.
    pub fn sum(&self, spec: &HashSpec) -> Result<Hash, CoreError> {
        Ok(spec.sum(&self.to_bytes()?))
    }

    /// True for the first header of a chain.
    pub fn is_genesis(&self) -> bool {
        self.header_link.is_null()
    }
}
