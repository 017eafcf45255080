//! The shared chain: a [`ChainState`] behind one reader/writer lock.
//!
//! Mutations (append, bundle start/close) hold the write lock for their full
//! duration, durable write included. Reads hold the read lock, so they never
//! observe a header without its entry.

use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashchain_core::{Entry, Hash, HashSpec, Header, Signer};
use tracing::debug;

use crate::bundle::Bundle;
use crate::error::{ChainError, Result};
use crate::log::ChainLog;
use crate::state::ChainState;

/// An append-only hash chain, optionally backed by a live append log.
///
/// Thread-safe via RwLock.
pub struct Chain {
    pub(crate) inner: RwLock<ChainInner>,
}

pub(crate) struct ChainInner {
    pub(crate) state: ChainState,
    pub(crate) log: Option<ChainLog>,
    pub(crate) bundle: Option<Bundle>,
}

impl Chain {
    /// Create an empty in-memory chain.
    pub fn new(spec: HashSpec) -> Self {
        Self::from_state(ChainState::new(spec))
    }

    /// Open a chain backed by the live append log at `path`.
    ///
    /// An existing file is replayed; a missing one is created empty.
    pub fn open(spec: HashSpec, path: impl AsRef<Path>) -> Result<Self> {
        let (log, state) = ChainLog::open(path.as_ref(), spec)?;
        Ok(Self {
            inner: RwLock::new(ChainInner {
                state,
                log: Some(log),
                bundle: None,
            }),
        })
    }

    pub(crate) fn from_state(state: ChainState) -> Self {
        Self {
            inner: RwLock::new(ChainInner {
                state,
                log: None,
                bundle: None,
            }),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, ChainInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ChainInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Append
    // =========================================================================

    /// Append an entry, returning the new header's hash.
    pub fn append(
        &self,
        timestamp: i64,
        entry_type: &str,
        entry: Entry,
        signer: &dyn Signer,
    ) -> Result<Hash> {
        self.append_with_change(timestamp, entry_type, entry, signer, None)
    }

    /// Append an entry whose header supersedes `change`.
    pub fn append_with_change(
        &self,
        timestamp: i64,
        entry_type: &str,
        entry: Entry,
        signer: &dyn Signer,
        change: Option<Hash>,
    ) -> Result<Hash> {
        let mut guard = self.write();
        let inner = &mut *guard;

        if inner.bundle.is_some() {
            return Err(ChainError::ChainLockedForBundle);
        }

        let linked = inner
            .state
            .prepare(timestamp, entry_type, &entry, signer, change, None)?;

        if let Some(log) = inner.log.as_mut() {
            log.append_pairs(inner.state.len(), [(&linked.header, &entry)])?;
        }

        inner.state.push(linked.hash, linked.header, entry);
        Ok(linked.hash)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// The header with hash `hash`.
    pub fn get(&self, hash: &Hash) -> Result<Header> {
        self.read().state.get(hash).cloned()
    }

    /// The entry with hash `entry_hash`, with its entry type.
    pub fn get_entry(&self, entry_hash: &Hash) -> Result<(Entry, String)> {
        let inner = self.read();
        let (entry, entry_type) = inner.state.get_entry(entry_hash)?;
        Ok((entry.clone(), entry_type.to_string()))
    }

    /// The header that commits to the entry with hash `entry_hash`.
    pub fn get_entry_header(&self, entry_hash: &Hash) -> Result<Header> {
        self.read().state.get_entry_header(entry_hash).cloned()
    }

    pub fn top(&self) -> Option<Header> {
        self.read().state.top().cloned()
    }

    pub fn top_hash(&self) -> Option<Hash> {
        self.read().state.top_hash()
    }

    /// The k-th header back from the tip; `nth(0)` is the tip.
    pub fn nth(&self, k: usize) -> Option<Header> {
        self.read().state.nth(k).cloned()
    }

    /// The most recent header of `entry_type`, with its hash.
    pub fn top_of_type(&self, entry_type: &str) -> Option<(Hash, Header)> {
        self.read()
            .state
            .top_of_type(entry_type)
            .map(|(hash, header)| (hash, header.clone()))
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Visit every pair from newest to oldest, stopping at the first error.
    pub fn walk<E, F>(&self, visit: F) -> std::result::Result<(), E>
    where
        E: From<ChainError>,
        F: FnMut(&Hash, &Header, &Entry) -> std::result::Result<(), E>,
    {
        self.read().state.walk(visit)
    }

    /// Visit pairs oldest first, starting at index `start`.
    pub fn for_each_from<E, F>(&self, start: usize, visit: F) -> std::result::Result<(), E>
    where
        E: From<ChainError>,
        F: FnMut(usize, &Hash, &Header, &Entry) -> std::result::Result<(), E>,
    {
        self.read().state.for_each_from(start, visit)
    }

    /// Recompute and check every hash link. Read-only; nothing is repaired.
    pub fn validate(&self, skip_entries: bool) -> Result<()> {
        self.read().state.validate(skip_entries)
    }

    /// See [`ChainState::validate_headers`].
    pub fn validate_headers(&self) -> Result<()> {
        self.read().state.validate_headers()
    }

    /// See [`ChainState::validate_entries`].
    pub fn validate_entries(&self) -> Result<()> {
        self.read().state.validate_entries()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn len(&self) -> usize {
        self.read().state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().state.is_empty()
    }

    pub fn hash_spec(&self) -> HashSpec {
        *self.read().state.spec()
    }

    /// True while a live append log is attached and open.
    pub fn is_persistent(&self) -> bool {
        self.read().log.as_ref().is_some_and(|log| !log.is_closed())
    }

    /// Release the live append log. A no-op without one, or when already
    /// closed. Later appends to a closed persistent chain fail.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.write();
        if let Some(log) = inner.log.as_mut() {
            log.close()?;
        }
        debug!("chain closed");
        Ok(())
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("Chain")
            .field("len", &inner.state.len())
            .field("top", &inner.state.top_hash())
            .field("persistent", &inner.log.is_some())
            .field("bundle_open", &inner.bundle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashchain_core::codec::MAX_FRAME_LEN;
    use hashchain_core::{CoreError, Keypair};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn keypair() -> Keypair {
        Keypair::from_seed(&[0x42; 32])
    }

    #[test]
    fn test_append_and_lookup() {
        let chain = Chain::new(HashSpec::default());
        let kp = keypair();

        let dna = chain.append(1, "%dna", Entry::from("dna"), &kp).unwrap();
        let post = chain.append(2, "post", Entry::from("hello"), &kp).unwrap();

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.top_hash(), Some(post));

        let header = chain.get(&post).unwrap();
        assert_eq!(header.header_link, dna);

        let (entry, entry_type) = chain.get_entry(&header.entry_link).unwrap();
        assert_eq!(entry, Entry::from("hello"));
        assert_eq!(entry_type, "post");
        assert_eq!(chain.get_entry_header(&header.entry_link).unwrap(), header);
        chain.validate(false).unwrap();
    }

    #[test]
    fn test_lookup_miss() {
        let chain = Chain::new(HashSpec::default());
        chain.append(1, "%dna", Entry::from("dna"), &keypair()).unwrap();

        let missing = Hash::from_bytes([0xab; 32]);
        assert!(matches!(chain.get(&missing), Err(ChainError::HashNotFound(h)) if h == missing));
        assert!(matches!(chain.get_entry(&missing), Err(ChainError::HashNotFound(_))));
        assert!(matches!(
            chain.get_entry_header(&missing),
            Err(ChainError::HashNotFound(_))
        ));
    }

    #[test]
    fn test_type_tops_track_latest() {
        let chain = Chain::new(HashSpec::default());
        let kp = keypair();
        chain.append(1, "A", Entry::from("a1"), &kp).unwrap();
        chain.append(2, "B", Entry::from("b1"), &kp).unwrap();
        let third = chain.append(3, "A", Entry::from("a2"), &kp).unwrap();

        let (hash, header) = chain.top_of_type("A").unwrap();
        assert_eq!(hash, third);
        assert_eq!(header.timestamp, 3);
        assert!(chain.top_of_type("C").is_none());
    }

    #[test]
    fn test_empty_chain_queries() {
        let chain = Chain::new(HashSpec::default());
        assert!(chain.is_empty());
        assert!(chain.top().is_none());
        assert!(chain.nth(0).is_none());
        chain.validate(false).unwrap();
        chain.close().unwrap();
    }

    #[test]
    fn test_persistent_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.log");
        let kp = keypair();

        let tip = {
            let chain = Chain::open(HashSpec::default(), &path).unwrap();
            assert!(chain.is_empty());
            chain.append(1, "%dna", Entry::from("dna"), &kp).unwrap();
            let tip = chain.append(2, "post", Entry::from("x"), &kp).unwrap();
            chain.close().unwrap();
            chain.close().unwrap();
            tip
        };

        let chain = Chain::open(HashSpec::default(), &path).unwrap();
        assert!(chain.is_persistent());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.top_hash(), Some(tip));
        chain.validate(false).unwrap();

        let next = chain.append(3, "post", Entry::from("y"), &kp).unwrap();
        assert_eq!(chain.get(&next).unwrap().header_link, tip);
    }

    #[test]
    fn test_oversized_append_leaves_log_replayable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.log");
        let kp = keypair();

        {
            let chain = Chain::open(HashSpec::default(), &path).unwrap();
            let tip = chain.append(1, "%dna", Entry::from("dna"), &kp).unwrap();

            let blob = Entry::from(vec![7u8; MAX_FRAME_LEN as usize + 1]);
            let result = chain.append(2, "blob", blob, &kp);
            assert!(matches!(
                result,
                Err(ChainError::Core {
                    op: "append",
                    index: 1,
                    source: CoreError::FrameTooLarge { .. },
                })
            ));
            assert_eq!(chain.len(), 1);
            assert_eq!(chain.top_hash(), Some(tip));
        }

        let chain = Chain::open(HashSpec::default(), &path).unwrap();
        assert_eq!(chain.len(), 1);
        chain.validate(false).unwrap();
    }

    #[test]
    fn test_json_float_entry_validates_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.log");
        let kp = keypair();

        {
            let chain = Chain::open(HashSpec::default(), &path).unwrap();
            chain.append(1, "%dna", Entry::from("dna"), &kp).unwrap();
            let reading = serde_json::json!({"v": 1.0715660391465826e-75, "w": 0.1});
            chain.append(2, "reading", Entry::Json(reading), &kp).unwrap();
            chain.validate(false).unwrap();
        }

        let chain = Chain::open(HashSpec::default(), &path).unwrap();
        assert_eq!(chain.len(), 2);
        chain.validate(false).unwrap();
    }

    #[test]
    fn test_append_after_close_fails_without_mutation() {
        let dir = TempDir::new().unwrap();
        let chain = Chain::open(HashSpec::default(), dir.path().join("c.log")).unwrap();
        chain.close().unwrap();

        let result = chain.append(1, "%dna", Entry::from("dna"), &keypair());
        assert!(matches!(result, Err(ChainError::Io { op: "append", .. })));
        assert!(chain.is_empty());
        assert!(!chain.is_persistent());
    }

    #[test]
    fn test_concurrent_appends_stay_linked() {
        let chain = Arc::new(Chain::new(HashSpec::default()));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let chain = Arc::clone(&chain);
                thread::spawn(move || {
                    let kp = Keypair::from_seed(&[t as u8; 32]);
                    for i in 0..10 {
                        chain
                            .append(i, "post", Entry::from(format!("{t}-{i}")), &kp)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(chain.len(), 40);
        chain.validate(false).unwrap();
    }
}
