//! Hash and hash specification types.
//!
//! Every digest in the chain is a 32-byte [`Hash`], computed under a
//! [`HashSpec`] that selects the algorithm and the text encoding.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CoreError;

/// A 32-byte content digest.
///
/// Two hashes are equal iff their digest bytes are equal. [`Hash::NULL`]
/// (also the `Default`) marks "no predecessor" in header links.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The null hash.
    pub const NULL: Self = Self([0u8; 32]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check whether this is the null hash.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHash(e.to_string()))?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice
            .try_into()
            .map_err(|_| CoreError::InvalidHash(format!("expected 32 bytes, got {}", slice.len())))?;
        Ok(Self(arr))
    }
}

/// Digest algorithm used for all content hashing in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha2_256,
}

/// Text encoding used when hashes are rendered for humans or peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashEncoding {
    #[default]
    Hex,
    Base58,
}

/// Algorithm + encoding selector, fixed at chain construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HashSpec {
    pub algorithm: HashAlgorithm,
    pub encoding: HashEncoding,
}

impl HashSpec {
    /// Create a spec from its parts.
    pub const fn new(algorithm: HashAlgorithm, encoding: HashEncoding) -> Self {
        Self {
            algorithm,
            encoding,
        }
    }

    /// Hash the given bytes.
    pub fn sum(&self, data: &[u8]) -> Hash {
        match self.algorithm {
            HashAlgorithm::Blake3 => Hash(*blake3::hash(data).as_bytes()),
            HashAlgorithm::Sha2_256 => {
                let mut hasher = Sha256::new();
                hasher.update(data);
                Hash(hasher.finalize().into())
            }
        }
    }

    /// Render a hash in this spec's encoding.
    pub fn encode(&self, hash: &Hash) -> String {
        match self.encoding {
            HashEncoding::Hex => hash.to_hex(),
            HashEncoding::Base58 => bs58::encode(hash.0).into_string(),
        }
    }

    /// Parse a hash rendered in this spec's encoding.
    pub fn decode(&self, s: &str) -> Result<Hash, CoreError> {
        match self.encoding {
            HashEncoding::Hex => Hash::from_hex(s),
            HashEncoding::Base58 => {
                let bytes = bs58::decode(s)
                    .into_vec()
                    .map_err(|e| CoreError::InvalidHash(e.to_string()))?;
                Hash::try_from(bytes.as_slice())
            }
        }
    }
}
