//! # Hash Chain Core
//!
//! Pure primitives for the hash chain: hashes, headers, entries, the
//! hash-link builder and the binary framing codec.
//!
//! This crate contains no locks and no files. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Hash`] / [`HashSpec`] - Content digests and the algorithm that makes them
//! - [`Header`] - Signed record linking an entry into the chain
//! - [`Entry`] - Tagged content payload
//! - [`Signer`] - The external signing capability
//!
//! ## Canonicalization
//!
//! Headers are encoded using deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod codec;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod header;
pub mod link;
pub mod types;

pub use canonical::{canonical_header_bytes, decode_header};
pub use codec::{ChainPair, MarshalFlags};
pub use crypto::{Keypair, PublicKey, Signature, Signer};
pub use entry::{
    Entry, AGENT_ENTRY_TYPE, DNA_ENTRY_TYPE, KEY_ENTRY_TYPE, MIGRATE_ENTRY_TYPE,
    PRIVATE_ENTRY_REDACTED,
};
pub use error::{CoreError, SignError};
pub use header::Header;
pub use link::{build_header, LinkTips, LinkedHeader};
pub use types::{Hash, HashAlgorithm, HashEncoding, HashSpec};
