//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use hashchain_core::{
    Entry, Hash, HashSpec, Keypair, PublicKey, AGENT_ENTRY_TYPE, DNA_ENTRY_TYPE,
};
use hashchain_store::{Chain, ChainError};

/// A test fixture with a keypair, a chain and a deterministic clock.
pub struct TestFixture {
    pub keypair: Keypair,
    pub chain: Chain,
    clock: AtomicI64,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self::from_parts(Keypair::generate(), Chain::new(HashSpec::default()))
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::from_parts(Keypair::from_seed(&seed), Chain::new(HashSpec::default()))
    }

    /// Create with a chain backed by the live log at `path`.
    pub fn persistent(seed: [u8; 32], path: &Path) -> Result<Self, ChainError> {
        let chain = Chain::open(HashSpec::default(), path)?;
        let fixture = Self::from_parts(Keypair::from_seed(&seed), chain);
        // Keep timestamps increasing across reopen.
        fixture.clock.store(fixture.chain.len() as i64, Ordering::SeqCst);
        Ok(fixture)
    }

    fn from_parts(keypair: Keypair, chain: Chain) -> Self {
        Self {
            keypair,
            chain,
            clock: AtomicI64::new(0),
        }
    }

    /// Get the keypair's public key.
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Next timestamp from the fixture's clock, starting at 1.
    pub fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Append the `%dna` and `%agent` records.
    pub fn genesis(&self) -> (Hash, Hash) {
        let dna = self.append_entry(DNA_ENTRY_TYPE, Entry::from("test dna"));
        let agent = self.append_entry(AGENT_ENTRY_TYPE, Entry::from(self.public_key().to_hex()));
        (dna, agent)
    }

    /// Append a text entry.
    pub fn append(&self, entry_type: &str, content: &str) -> Hash {
        self.append_entry(entry_type, Entry::from(content))
    }

    pub fn append_entry(&self, entry_type: &str, entry: Entry) -> Hash {
        self.chain
            .append(self.tick(), entry_type, entry, &self.keypair)
            .expect("fixture append failed")
    }

    /// Append `n` distinct text entries of one type.
    pub fn append_many(&self, entry_type: &str, n: usize) -> Vec<Hash> {
        (0..n)
            .map(|i| {
                let content = format!("{entry_type} #{i} @ {}", self.chain.len());
                self.append(entry_type, &content)
            })
            .collect()
    }

    /// Stage `n` distinct text entries in the open bundle.
    pub fn stage_many(&self, entry_type: &str, n: usize) -> Vec<Hash> {
        let bundle = self.chain.bundle().expect("no bundle open");
        (0..n)
            .map(|i| {
                let content = format!("staged {entry_type} #{i}");
                bundle
                    .append(self.tick(), entry_type, Entry::from(content), &self.keypair)
                    .expect("fixture bundle append failed")
            })
            .collect()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixture_genesis() {
        let fixture = TestFixture::with_seed([7; 32]);
        let (dna, agent) = fixture.genesis();

        assert_eq!(fixture.chain.len(), 2);
        assert!(fixture.chain.get(&dna).unwrap().is_genesis());
        assert_eq!(fixture.chain.get(&agent).unwrap().timestamp, 2);
    }

    #[test]
    fn test_fixture_chain() {
        let fixture = TestFixture::new();
        fixture.genesis();
        let posts = fixture.append_many("post", 3);

        assert_eq!(fixture.chain.len(), 5);
        assert_eq!(fixture.chain.top_of_type("post").unwrap().0, posts[2]);
        fixture.chain.validate(false).unwrap();
    }

    #[test]
    fn test_persistent_fixture_resumes_clock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.log");
        {
            let fixture = TestFixture::persistent([1; 32], &path).unwrap();
            fixture.genesis();
        }

        let fixture = TestFixture::persistent([1; 32], &path).unwrap();
        let hash = fixture.append("post", "after reopen");
        assert_eq!(fixture.chain.get(&hash).unwrap().timestamp, 3);
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);

        let pks: Vec<_> = parties.iter().map(|p| p.public_key()).collect();
        assert_ne!(pks[0], pks[1]);
        assert_ne!(pks[1], pks[2]);
        assert_ne!(pks[0], pks[2]);
    }
}
