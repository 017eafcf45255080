//! Bundles: atomic multi-entry transactions over a chain.
//!
//! A bundle stages pairs into its own [`ChainState`]. Staged headers link to
//! the parent's tips until the bundle has produced its own, so committing is
//! a plain replay of the staged pairs onto the parent. While a bundle is
//! open the parent rejects direct appends.
//!
//! Bundles do not nest: [`BundleHandle`] has no way to open another one.

use hashchain_core::{Entry, Hash, Header, Signer};
use serde::Serialize;
use tracing::debug;

use crate::chain::Chain;
use crate::error::{ChainError, Result};
use crate::state::ChainState;

/// An open bundle, owned by the parent chain's locked state.
#[derive(Debug)]
pub(crate) struct Bundle {
    /// Parent length when the bundle started: the index the first staged
    /// pair takes on commit.
    start_index: usize,
    /// Caller parameter, serialized to JSON.
    user_param: String,
    staged: ChainState,
}

impl Chain {
    /// Open a bundle. `param` is serialized to JSON and kept for audit.
    pub fn start_bundle<P: Serialize + ?Sized>(&self, param: &P) -> Result<()> {
        let user_param = serde_json::to_string(param)?;

        let mut inner = self.write();
        if inner.bundle.is_some() {
            return Err(ChainError::BundleAlreadyStarted);
        }

        let start_index = inner.state.len();
        debug!(start_index, "bundle started");
        inner.bundle = Some(Bundle {
            start_index,
            user_param,
            staged: ChainState::new(*inner.state.spec()),
        });
        Ok(())
    }

    pub fn bundle_started(&self) -> bool {
        self.read().bundle.is_some()
    }

    /// Handle for appending to and reading from the open bundle.
    pub fn bundle(&self) -> Result<BundleHandle<'_>> {
        if !self.bundle_started() {
            return Err(ChainError::BundleNotStarted);
        }
        Ok(BundleHandle { chain: self })
    }

    /// Close the open bundle, replaying its pairs onto the chain when
    /// `commit` is set and dropping them otherwise.
    ///
    /// On commit the whole batch is written to the live log before the
    /// in-memory chain changes. If that write fails the bundle stays open.
    pub fn close_bundle(&self, commit: bool) -> Result<()> {
        let mut guard = self.write();
        let inner = &mut *guard;

        let Some(bundle) = inner.bundle.as_ref() else {
            return Err(ChainError::BundleNotStarted);
        };

        if commit {
            inner.state.check_complete()?;
            bundle.staged.check_complete()?;
            if let Some(log) = inner.log.as_mut() {
                let pairs = bundle.staged.headers.iter().zip(&bundle.staged.entries);
                log.append_pairs(inner.state.len(), pairs)?;
            }
        }

        let Some(bundle) = inner.bundle.take() else {
            return Err(ChainError::BundleNotStarted);
        };
        let staged = bundle.staged;
        let count = staged.len();

        if commit {
            let pairs = staged.hashes.into_iter().zip(staged.headers).zip(staged.entries);
            for ((hash, header), entry) in pairs {
                inner.state.push(hash, header, entry);
            }
            debug!(count, len = inner.state.len(), "bundle committed");
        } else {
            debug!(count, "bundle discarded");
        }
        Ok(())
    }
}

/// Borrowed access to a chain's open bundle.
///
/// Every call takes the parent chain's lock and fails with
/// `BundleNotStarted` once the bundle has been closed.
#[derive(Debug, Clone, Copy)]
pub struct BundleHandle<'a> {
    chain: &'a Chain,
}

impl BundleHandle<'_> {
    fn with_bundle<T>(&self, f: impl FnOnce(&Bundle, &ChainState) -> T) -> Result<T> {
        let inner = self.chain.read();
        let bundle = inner.bundle.as_ref().ok_or(ChainError::BundleNotStarted)?;
        Ok(f(bundle, &inner.state))
    }

    /// Stage an entry, returning its header hash.
    pub fn append(
        &self,
        timestamp: i64,
        entry_type: &str,
        entry: Entry,
        signer: &dyn Signer,
    ) -> Result<Hash> {
        self.append_with_change(timestamp, entry_type, entry, signer, None)
    }

    pub fn append_with_change(
        &self,
        timestamp: i64,
        entry_type: &str,
        entry: Entry,
        signer: &dyn Signer,
        change: Option<Hash>,
    ) -> Result<Hash> {
        let mut guard = self.chain.write();
        let inner = &mut *guard;
        let bundle = inner.bundle.as_mut().ok_or(ChainError::BundleNotStarted)?;

        let linked = bundle.staged.prepare(
            timestamp,
            entry_type,
            &entry,
            signer,
            change,
            Some(&inner.state),
        )?;
        bundle.staged.push(linked.hash, linked.header, entry);
        Ok(linked.hash)
    }

    /// Number of staged pairs.
    pub fn len(&self) -> Result<usize> {
        self.with_bundle(|b, _| b.staged.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.with_bundle(|b, _| b.staged.is_empty())
    }

    /// The latest staged header, if any.
    pub fn top(&self) -> Result<Option<Header>> {
        self.with_bundle(|b, _| b.staged.top().cloned())
    }

    /// The latest header of `entry_type`, staged or already on the parent.
    pub fn top_of_type(&self, entry_type: &str) -> Result<Option<(Hash, Header)>> {
        self.with_bundle(|b, parent| {
            b.staged
                .top_of_type(entry_type)
                .or_else(|| parent.top_of_type(entry_type))
                .map(|(hash, header)| (hash, header.clone()))
        })
    }

    /// A staged entry by hash, with its entry type.
    pub fn get_entry(&self, entry_hash: &Hash) -> Result<(Entry, String)> {
        self.with_bundle(|b, _| {
            b.staged
                .get_entry(entry_hash)
                .map(|(entry, entry_type)| (entry.clone(), entry_type.to_string()))
        })?
    }

    /// The JSON form of the parameter given to `start_bundle`.
    pub fn user_param(&self) -> Result<String> {
        self.with_bundle(|b, _| b.user_param.clone())
    }

    pub fn start_index(&self) -> Result<usize> {
        self.with_bundle(|b, _| b.start_index)
    }
}
