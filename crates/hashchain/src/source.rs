//! The source chain: one agent's chain, its signer and its configuration.
//!
//! `SourceChain` stamps timestamps from the system clock and signs with the
//! signer it owns, so callers deal only in entry types and content.

use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use hashchain_core::{Entry, Hash, MarshalFlags, Signer, AGENT_ENTRY_TYPE, DNA_ENTRY_TYPE};
use hashchain_store::Chain;
use serde::Serialize;
use tracing::debug;

use crate::config::ChainConfig;
use crate::error::{Result, SourceChainError};

pub struct SourceChain<S: Signer> {
    chain: Chain,
    signer: S,
    config: ChainConfig,
}

impl<S: Signer> SourceChain<S> {
    /// Open the chain described by `config`.
    ///
    /// A file-backed chain is replayed from its log and, when
    /// `validate_on_open` is set, validated before it is returned.
    pub fn open(config: ChainConfig, signer: S) -> Result<Self> {
        let chain = match &config.path {
            Some(path) => Chain::open(config.hash_spec, path)?,
            None => Chain::new(config.hash_spec),
        };

        if config.validate_on_open && chain.is_persistent() {
            chain.validate(false)?;
        }
        debug!(len = chain.len(), persistent = chain.is_persistent(), "source chain opened");

        Ok(Self {
            chain,
            signer,
            config,
        })
    }

    /// Rebuild an in-memory source chain from a stream written by
    /// [`export`](Self::export).
    ///
    /// When `validate_on_open` is set, whatever the stream still proves is
    /// validated: header links unless headers were dropped or filtered,
    /// entries unless they were dropped or redacted.
    pub fn import<R: Read + ?Sized>(
        config: ChainConfig,
        signer: S,
        reader: &mut R,
    ) -> Result<(MarshalFlags, Self)> {
        if config.path.is_some() {
            return Err(SourceChainError::InvalidOperation(
                "import builds an in-memory chain; clear `path`".into(),
            ));
        }

        let (flags, chain) = Chain::unmarshal(config.hash_spec, reader)?;
        if config.validate_on_open {
            validate_import(&chain, flags)?;
        }
        debug!(len = chain.len(), flags = flags.bits(), "source chain imported");

        Ok((
            flags,
            Self {
                chain,
                signer,
                config,
            },
        ))
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Write the `%dna` and `%agent` records that open every chain.
    ///
    /// Returns their header hashes.
    pub fn genesis(&self, dna: Entry, agent: Entry) -> Result<(Hash, Hash)> {
        if !self.chain.is_empty() {
            return Err(SourceChainError::InvalidOperation(format!(
                "genesis on a chain of length {}",
                self.chain.len()
            )));
        }
        let dna = self.commit(DNA_ENTRY_TYPE, dna)?;
        let agent = self.commit(AGENT_ENTRY_TYPE, agent)?;
        Ok((dna, agent))
    }

    /// Append an entry, returning its header hash.
    pub fn commit(&self, entry_type: &str, entry: Entry) -> Result<Hash> {
        Ok(self
            .chain
            .append(now_millis(), entry_type, entry, &self.signer)?)
    }

    /// Append an entry that supersedes the record with header hash `change`.
    pub fn commit_change(&self, entry_type: &str, entry: Entry, change: Hash) -> Result<Hash> {
        Ok(self.chain.append_with_change(
            now_millis(),
            entry_type,
            entry,
            &self.signer,
            Some(change),
        )?)
    }

    pub fn start_bundle<P: Serialize + ?Sized>(&self, param: &P) -> Result<()> {
        Ok(self.chain.start_bundle(param)?)
    }

    /// Stage an entry in the open bundle.
    pub fn commit_to_bundle(&self, entry_type: &str, entry: Entry) -> Result<Hash> {
        Ok(self
            .chain
            .bundle()?
            .append(now_millis(), entry_type, entry, &self.signer)?)
    }

    pub fn close_bundle(&self, commit: bool) -> Result<()> {
        Ok(self.chain.close_bundle(commit)?)
    }

    /// Serialize the chain. See [`Chain::marshal`].
    pub fn export<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        flags: MarshalFlags,
        allow_types: &[&str],
        private_types: &[&str],
    ) -> Result<()> {
        Ok(self.chain.marshal(writer, flags, allow_types, private_types)?)
    }

    pub fn validate(&self, skip_entries: bool) -> Result<()> {
        Ok(self.chain.validate(skip_entries)?)
    }

    pub fn close(&self) -> Result<()> {
        Ok(self.chain.close()?)
    }
}

impl<S: Signer> std::fmt::Debug for SourceChain<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceChain")
            .field("chain", &self.chain)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Milliseconds since the Unix epoch. A clock set before 1970 reads as 0.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

/// Validate the parts of an imported chain that its flags leave intact.
fn validate_import(chain: &Chain, flags: MarshalFlags) -> Result<()> {
    let has_headers = !flags.contains(MarshalFlags::NO_HEADERS);
    let headers = has_headers && !flags.contains(MarshalFlags::SELECTIVE);
    let entries = has_headers
        && !flags.contains(MarshalFlags::NO_ENTRIES)
        && !flags.contains(MarshalFlags::NO_PRIVATE)
        && !flags.contains(MarshalFlags::OMIT_DNA);

    match (headers, entries) {
        (true, true) => chain.validate(false)?,
        (true, false) => chain.validate_headers()?,
        (false, true) => chain.validate_entries()?,
        (false, false) => {}
    }
    debug!(headers, entries, "imported chain validated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashchain_core::Keypair;
    use hashchain_store::ChainError;
    use serde_json::json;

    fn source() -> SourceChain<Keypair> {
        SourceChain::open(ChainConfig::default(), Keypair::from_seed(&[1; 32])).unwrap()
    }

    #[test]
    fn test_genesis_once() {
        let source = source();
        let (dna, agent) = source
            .genesis(Entry::from("dna"), Entry::from("alice"))
            .unwrap();

        let chain = source.chain();
        assert_eq!(chain.len(), 2);
        assert!(chain.get(&dna).unwrap().is_genesis());
        assert_eq!(chain.get(&agent).unwrap().header_link, dna);

        assert!(matches!(
            source.genesis(Entry::from("dna2"), Entry::from("bob")),
            Err(SourceChainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_commit_change_links_back() {
        let source = source();
        source.genesis(Entry::from("dna"), Entry::from("alice")).unwrap();
        let first = source.commit("profile", Entry::Json(json!({"v": 1}))).unwrap();
        let second = source
            .commit_change("profile", Entry::Json(json!({"v": 2})), first)
            .unwrap();

        let header = source.chain().get(&second).unwrap();
        assert_eq!(header.change, Some(first));
        assert_eq!(header.type_link, first);
        source.validate(false).unwrap();
    }

    #[test]
    fn test_bundle_flow() {
        let source = source();
        source.genesis(Entry::from("dna"), Entry::from("alice")).unwrap();

        source.start_bundle(&json!({"op": "import"})).unwrap();
        source.commit_to_bundle("post", Entry::from("a")).unwrap();
        assert!(matches!(
            source.commit("post", Entry::from("direct")),
            Err(SourceChainError::Chain(ChainError::ChainLockedForBundle))
        ));
        source.close_bundle(true).unwrap();

        assert_eq!(source.chain().len(), 3);
        assert!(matches!(
            source.commit_to_bundle("post", Entry::from("b")),
            Err(SourceChainError::Chain(ChainError::BundleNotStarted))
        ));
    }

    #[test]
    fn test_import_rejects_path() {
        let result = SourceChain::import(
            ChainConfig::persistent("x.log"),
            Keypair::from_seed(&[1; 32]),
            &mut std::io::empty(),
        );
        assert!(matches!(result, Err(SourceChainError::InvalidOperation(_))));
    }
}
