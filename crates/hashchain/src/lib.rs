//! # Hash Chain
//!
//! The unified API for an agent's source chain: an append-only,
//! cryptographically linked ledger of (header, entry) pairs.
//!
//! ## Overview
//!
//! - **Headers** commit to their entry, to the previous header and to the
//!   previous header of the same entry type.
//! - **Bundles** stage several entries and commit them atomically.
//! - **Export** writes a selective, optionally redacted pair stream that
//!   [`SourceChain::import`] reads back.
//! - **Views** render a chain as a text dump, a JSON document or a dot graph.
//!
//! ## Usage
//!
//! ```rust
//! use hashchain::{ChainConfig, Entry, Keypair, SourceChain};
//!
//! let source = SourceChain::open(ChainConfig::default(), Keypair::generate()).unwrap();
//! source.genesis(Entry::from("dna"), Entry::from("agent")).unwrap();
//! source.commit("post", Entry::from("hello")).unwrap();
//!
//! source.validate(false).unwrap();
//! println!("{}", hashchain::export::dump(source.chain(), 0).unwrap());
//! ```
//!
//! ## Re-exports
//!
//! - `hashchain::core` - Core primitives (Hash, Header, Entry, codec)
//! - `hashchain::store` - The chain store, bundles and marshaling

pub mod config;
pub mod error;
pub mod export;
pub mod source;

pub use config::ChainConfig;
pub use error::{Result, SourceChainError};
pub use source::SourceChain;

pub use hashchain_core as core;
pub use hashchain_store as store;

pub use hashchain_core::{
    Entry, Hash, HashAlgorithm, HashEncoding, HashSpec, Header, Keypair, MarshalFlags, PublicKey,
    SignError, Signature, Signer,
};
pub use hashchain_store::{BundleHandle, Chain, ChainError};
