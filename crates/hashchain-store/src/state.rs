//! Chain state: parallel arrays plus the lookup indices over them.
//!
//! `ChainState` holds no lock and no file. [`Chain`](crate::Chain) wraps it
//! for shared use; bundles stage into a second instance.

use std::collections::HashMap;

use hashchain_core::{build_header, Entry, Hash, HashSpec, Header, LinkTips, LinkedHeader, Signer};

use crate::error::{ChainError, Result};

/// Parallel arrays with their indices.
///
/// Pairs enter only through [`prepare`](Self::prepare) on the append path
/// or [`add_pair`](Self::add_pair) on reconstruction, both of which keep
/// hashes unique. The raw push is crate-private:
///
/// ```compile_fail
/// use hashchain_core::{Entry, Hash, HashSpec, Header};
/// use hashchain_store::ChainState;
///
/// fn smuggle(state: &mut ChainState, header: Header) {
///     state.push(Hash::NULL, header, Entry::from("x"));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChainState {
    spec: HashSpec,

    /// Header hash at each index.
    pub(crate) hashes: Vec<Hash>,
    pub(crate) headers: Vec<Header>,
    pub(crate) entries: Vec<Entry>,

    /// Header hash -> index.
    header_index: HashMap<Hash, usize>,

    /// Entry hash -> index.
    entry_index: HashMap<Hash, usize>,

    /// Entry type -> index of its most recent header.
    type_tops: HashMap<String, usize>,
}

impl ChainState {
    pub fn new(spec: HashSpec) -> Self {
        Self {
            spec,
            hashes: Vec::new(),
            headers: Vec::new(),
            entries: Vec::new(),
            header_index: HashMap::new(),
            entry_index: HashMap::new(),
            type_tops: HashMap::new(),
        }
    }

    pub fn spec(&self) -> &HashSpec {
        &self.spec
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Fail with `IncompleteChain` unless the three arrays line up.
    pub fn check_complete(&self) -> Result<()> {
        if self.hashes.len() != self.headers.len() || self.headers.len() != self.entries.len() {
            return Err(self.incomplete());
        }
        Ok(())
    }

    fn incomplete(&self) -> ChainError {
        ChainError::IncompleteChain {
            hashes: self.hashes.len(),
            headers: self.headers.len(),
            entries: self.entries.len(),
        }
    }

    // =========================================================================
    // Append path
    // =========================================================================

    /// The tips a new header of `entry_type` links to.
    ///
    /// A staged bundle falls back to its parent's tips for anything it has
    /// not produced itself.
    pub fn tips(&self, entry_type: &str, parent: Option<&ChainState>) -> LinkTips {
        let header = self
            .top_hash()
            .or_else(|| parent.and_then(ChainState::top_hash))
            .unwrap_or(Hash::NULL);
        let type_header = self
            .top_of_type(entry_type)
            .or_else(|| parent.and_then(|p| p.top_of_type(entry_type)))
            .map(|(hash, _)| hash)
            .unwrap_or(Hash::NULL);
        LinkTips {
            header,
            type_header,
        }
    }

    /// Build and sign the next header without touching any state.
    ///
    /// Runs every fallible step of an append: the completeness check,
    /// signing and the uniqueness check against this state and `parent`.
    pub fn prepare(
        &self,
        timestamp: i64,
        entry_type: &str,
        entry: &Entry,
        signer: &dyn Signer,
        change: Option<Hash>,
        parent: Option<&ChainState>,
    ) -> Result<LinkedHeader> {
        self.check_complete()?;

        let index = self.len() + parent.map_or(0, ChainState::len);
        let tips = self.tips(entry_type, parent);
        let linked = build_header(&self.spec, tips, timestamp, entry_type, entry, signer, change)
            .map_err(ChainError::core("append", index))?;

        self.check_unique(&linked.hash, &linked.entry_hash)?;
        if let Some(parent) = parent {
            parent.check_unique(&linked.hash, &linked.entry_hash)?;
        }
        Ok(linked)
    }

    pub fn check_unique(&self, hash: &Hash, entry_hash: &Hash) -> Result<()> {
        if self.header_index.contains_key(hash) {
            return Err(ChainError::DuplicateHash(*hash));
        }
        if self.entry_index.contains_key(entry_hash) {
            return Err(ChainError::DuplicateHash(*entry_hash));
        }
        Ok(())
    }

    /// Extend the arrays and indices with an already checked pair.
    ///
    /// Infallible: callers run [`prepare`](Self::prepare) or
    /// [`check_unique`](Self::check_unique) first.
    pub(crate) fn push(&mut self, hash: Hash, header: Header, entry: Entry) {
        let index = self.headers.len();
        self.header_index.insert(hash, index);
        self.entry_index.insert(header.entry_link, index);
        self.type_tops.insert(header.entry_type.clone(), index);
        self.hashes.push(hash);
        self.headers.push(header);
        self.entries.push(entry);
    }

    // =========================================================================
    // Reconstruction
    // =========================================================================

    /// Add one pair read back from a stream.
    ///
    /// A header's own hash is not part of its frame, so the hash of pair
    /// `i - 1` is taken from the `header_link` of pair `i`. The tip hash is
    /// fixed by [`finish_computed`](Self::finish_computed) or
    /// [`finish_with`](Self::finish_with) once the stream ends.
    pub fn add_pair(&mut self, header: Option<Header>, entry: Option<Entry>) -> Result<()> {
        if let Some(header) = header {
            let index = self.headers.len();
            let previous = (index > 0).then_some(header.header_link);

            if let Some(previous) = previous {
                if self.header_index.contains_key(&previous) {
                    return Err(ChainError::DuplicateHash(previous));
                }
            }
            if self.entry_index.contains_key(&header.entry_link) {
                return Err(ChainError::DuplicateHash(header.entry_link));
            }

            if let Some(previous) = previous {
                self.header_index.insert(previous, self.hashes.len());
                self.hashes.push(previous);
            }
            self.entry_index.insert(header.entry_link, index);
            self.type_tops.insert(header.entry_type.clone(), index);
            self.headers.push(header);
        }
        if let Some(entry) = entry {
            self.entries.push(entry);
        }
        Ok(())
    }

    /// Close a reconstruction by hashing the final header.
    pub fn finish_computed(&mut self) -> Result<()> {
        let Some(last) = self.headers.last() else {
            return Ok(());
        };
        if self.hashes.len() == self.headers.len() {
            return Ok(());
        }
        let tip = last
            .sum(&self.spec)
            .map_err(ChainError::core("replay", self.headers.len() - 1))?;
        self.push_tip(tip)
    }

    /// Close a reconstruction with a tip hash read from the stream.
    ///
    /// An empty state discards `tip`.
    pub fn finish_with(&mut self, tip: Hash) -> Result<()> {
        if self.headers.is_empty() || self.hashes.len() == self.headers.len() {
            return Ok(());
        }
        self.push_tip(tip)
    }

    fn push_tip(&mut self, tip: Hash) -> Result<()> {
        if self.header_index.contains_key(&tip) {
            return Err(ChainError::DuplicateHash(tip));
        }
        self.header_index.insert(tip, self.hashes.len());
        self.hashes.push(tip);
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn top_hash(&self) -> Option<Hash> {
        self.hashes.last().copied()
    }

    pub fn top(&self) -> Option<&Header> {
        self.headers.last()
    }

    /// The k-th header counting back from the tip (0 is the tip).
    pub fn nth(&self, k: usize) -> Option<&Header> {
        let len = self.headers.len();
        if k >= len {
            return None;
        }
        self.headers.get(len - 1 - k)
    }

    pub fn top_of_type(&self, entry_type: &str) -> Option<(Hash, &Header)> {
        let &index = self.type_tops.get(entry_type)?;
        Some((*self.hashes.get(index)?, self.headers.get(index)?))
    }

    pub fn get(&self, hash: &Hash) -> Result<&Header> {
        self.header_index
            .get(hash)
            .and_then(|&i| self.headers.get(i))
            .ok_or(ChainError::HashNotFound(*hash))
    }

    pub fn get_entry(&self, entry_hash: &Hash) -> Result<(&Entry, &str)> {
        self.entry_index
            .get(entry_hash)
            .and_then(|&i| Some((self.entries.get(i)?, self.headers.get(i)?.entry_type.as_str())))
            .ok_or(ChainError::HashNotFound(*entry_hash))
    }

    pub fn get_entry_header(&self, entry_hash: &Hash) -> Result<&Header> {
        self.entry_index
            .get(entry_hash)
            .and_then(|&i| self.headers.get(i))
            .ok_or(ChainError::HashNotFound(*entry_hash))
    }

    /// Visit every pair from newest to oldest.
    pub fn walk<E, F>(&self, mut visit: F) -> std::result::Result<(), E>
    where
        E: From<ChainError>,
        F: FnMut(&Hash, &Header, &Entry) -> std::result::Result<(), E>,
    {
        self.check_complete()?;
        for i in (0..self.headers.len()).rev() {
            visit(&self.hashes[i], &self.headers[i], &self.entries[i])?;
        }
        Ok(())
    }

    /// Visit pairs oldest first, starting at `start`.
    pub fn for_each_from<E, F>(&self, start: usize, mut visit: F) -> std::result::Result<(), E>
    where
        E: From<ChainError>,
        F: FnMut(usize, &Hash, &Header, &Entry) -> std::result::Result<(), E>,
    {
        self.check_complete()?;
        for i in start..self.headers.len() {
            visit(i, &self.hashes[i], &self.headers[i], &self.entries[i])?;
        }
        Ok(())
    }

    /// Recompute every hash link.
    ///
    /// Header `i` is checked against the `header_link` of header `i + 1`,
    /// and the final header against the recorded tip hash. Entries are
    /// checked against their header's `entry_link` unless `skip_entries`.
    pub fn validate(&self, skip_entries: bool) -> Result<()> {
        self.check_complete()?;
        self.check_links(true, !skip_entries)
    }

    /// Check header links only. A view without entries passes.
    pub fn validate_headers(&self) -> Result<()> {
        if self.hashes.len() != self.headers.len() {
            return Err(self.incomplete());
        }
        self.check_links(true, false)
    }

    /// Check each entry against its own header's `entry_link`, whatever
    /// the headers link to. Filtered views pass.
    pub fn validate_entries(&self) -> Result<()> {
        if self.headers.len() != self.entries.len() {
            return Err(self.incomplete());
        }
        self.check_links(false, true)
    }

    fn check_links(&self, headers: bool, entries: bool) -> Result<()> {
        for (index, header) in self.headers.iter().enumerate() {
            if headers {
                let expected = match self.headers.get(index + 1) {
                    Some(next) => next.header_link,
                    None => self.hashes[index],
                };
                let actual = header
                    .sum(&self.spec)
                    .map_err(ChainError::core("validate", index))?;
                if actual != expected {
                    return Err(ChainError::HeaderHashMismatch { index });
                }
            }

            if entries {
                let entry_hash = self.entries[index]
                    .sum(&self.spec)
                    .map_err(ChainError::core("validate", index))?;
                if entry_hash != header.entry_link {
                    return Err(ChainError::EntryHashMismatch { index });
                }
            }
        }
        Ok(())
    }
}
