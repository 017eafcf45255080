//! # Hash Chain Store
//!
//! The indexed, lock-guarded chain built on `hashchain-core` primitives.
//!
//! ## Overview
//!
//! A [`Chain`] keeps headers, entries and header hashes in parallel arrays
//! with lookup indices by header hash, by entry hash and by entry type. It
//! can be backed by a live append log, in which case every append is written
//! durably before it becomes visible.
//!
//! ## Key Types
//!
//! - [`Chain`] - The shared chain (one `RwLock`)
//! - [`ChainState`] - Lock-free arrays and indices, with reconstruction
//! - [`BundleHandle`] - Access to an open bundle
//! - [`ChainLog`] - The live append log
//!
//! ## Usage
//!
//! ```rust
//! use hashchain_core::{Entry, HashSpec, Keypair, MarshalFlags};
//! use hashchain_store::Chain;
//!
//! let chain = Chain::new(HashSpec::default());
//! let keypair = Keypair::from_seed(&[1; 32]);
//! chain.append(0, "%dna", Entry::from("dna"), &keypair).unwrap();
//!
//! chain.start_bundle("import").unwrap();
//! chain.bundle().unwrap().append(1, "post", Entry::from("hi"), &keypair).unwrap();
//! chain.close_bundle(true).unwrap();
//!
//! let mut buf = Vec::new();
//! chain.marshal(&mut buf, MarshalFlags::NONE, &[], &[]).unwrap();
//! let (_, copy) = Chain::unmarshal(HashSpec::default(), &mut buf.as_slice()).unwrap();
//! assert_eq!(copy.top_hash(), chain.top_hash());
//! ```
//!
//! ## Design Notes
//!
//! - Every fallible step of an append (signing, uniqueness, durable write)
//!   runs before the arrays change.
//! - Header and entry hashes are unique within a chain.

pub mod bundle;
pub mod chain;
pub mod error;
pub mod log;
pub mod marshal;
pub mod state;

pub use bundle::BundleHandle;
pub use chain::Chain;
pub use error::{ChainError, Result};
pub use log::ChainLog;
pub use marshal::{marshal, unmarshal};
pub use state::ChainState;
