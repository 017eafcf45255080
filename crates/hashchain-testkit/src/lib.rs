//! # Hash Chain Testkit
//!
//! Testing utilities for the hash chain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Header vectors**: Known inputs whose header hashes must stay stable
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Header Vectors
//!
//! ```rust
//! use hashchain_testkit::vectors::{all_vectors, generate_header_from_vector};
//!
//! for vector in all_vectors() {
//!     let linked = generate_header_from_vector(&vector);
//!     println!("{}: {}", vector.name, linked.hash.to_hex());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use hashchain_testkit::generators::{append_script, chain_from_script, keypair};
//!
//! proptest! {
//!     #[test]
//!     fn chain_validates(script in append_script(16), kp in keypair()) {
//!         let chain = chain_from_script(&script, &kp);
//!         prop_assert!(chain.validate(false).is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use hashchain_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::with_seed([1; 32]);
//! fixture.genesis();
//! fixture.append("post", "hello");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture};
pub use generators::{append_script, chain_from_script, AppendOp};
pub use vectors::{all_vectors, generate_header_from_vector, verify_all_vectors, HeaderVector};
