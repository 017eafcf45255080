//! Pair-stream serialization of a whole chain.
//!
//! Stream layout:
//! ```text
//! [flags: u64 LE][count: u64 LE][pair] * count [tip hash]?
//! ```
//! The trailing tip hash is the hash of the last emitted header and is
//! present unless `NO_HEADERS` is set. It is the null hash when no pair was
//! emitted.
//!
//! The written flags describe the stream, not just the request: `SELECTIVE`
//! is set when the allow list dropped pairs and `NO_PRIVATE` when an entry
//! was redacted.

use std::borrow::Cow;
use std::io::{Read, Write};

use hashchain_core::codec::{read_hash, read_pair, write_hash, write_pair};
use hashchain_core::{Entry, Hash, HashSpec, MarshalFlags};
use tracing::warn;

use crate::chain::Chain;
use crate::error::{ChainError, Result};
use crate::state::ChainState;

/// Serialize `chain` to `writer`.
///
/// Index 0 is always emitted. Any other pair is emitted when `allow_types`
/// is empty or names its type. Entries whose type is in `private_types` are
/// replaced by the redaction sentinel; their headers are kept. A
/// `SELECTIVE` bit passed in `flags` is ignored.
pub fn marshal<W: Write + ?Sized>(
    chain: &Chain,
    writer: &mut W,
    flags: MarshalFlags,
    allow_types: &[&str],
    private_types: &[&str],
) -> Result<()> {
    let inner = chain.read();
    write_state(&inner.state, writer, flags, allow_types, private_types)
}

/// Rebuild an in-memory chain from a stream written by [`marshal`].
pub fn unmarshal<R: Read + ?Sized>(spec: HashSpec, reader: &mut R) -> Result<(MarshalFlags, Chain)> {
    read_state(spec, reader)
        .map(|(flags, state)| (flags, Chain::from_state(state)))
        .map_err(|e| {
            warn!(error = %e, "failed to unmarshal chain");
            e
        })
}

impl Chain {
    /// See [`marshal`].
    pub fn marshal<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        flags: MarshalFlags,
        allow_types: &[&str],
        private_types: &[&str],
    ) -> Result<()> {
        marshal(self, writer, flags, allow_types, private_types)
    }

    /// See [`unmarshal`].
    pub fn unmarshal<R: Read + ?Sized>(spec: HashSpec, reader: &mut R) -> Result<(MarshalFlags, Chain)> {
        unmarshal(spec, reader)
    }
}

fn write_state<W: Write + ?Sized>(
    state: &ChainState,
    writer: &mut W,
    flags: MarshalFlags,
    allow_types: &[&str],
    private_types: &[&str],
) -> Result<()> {
    state.check_complete()?;
    let mut flags = flags.normalized().without(MarshalFlags::SELECTIVE);
    let no_headers = flags.contains(MarshalFlags::NO_HEADERS);
    let no_entries = flags.contains(MarshalFlags::NO_ENTRIES);
    let is_private = |i: usize| private_types.contains(&state.headers[i].entry_type.as_str());

    let selected: Vec<usize> = (0..state.len())
        .filter(|&i| {
            i == 0
                || allow_types.is_empty()
                || allow_types.contains(&state.headers[i].entry_type.as_str())
        })
        .collect();

    if selected.len() < state.len() {
        flags = flags | MarshalFlags::SELECTIVE;
    }
    if !no_entries && selected.iter().any(|&i| is_private(i)) {
        flags = flags | MarshalFlags::NO_PRIVATE;
    }

    writer
        .write_all(&flags.bits().to_le_bytes())
        .and_then(|()| writer.write_all(&(selected.len() as u64).to_le_bytes()))
        .map_err(ChainError::io("marshal"))?;

    let mut last = Hash::NULL;
    for &i in &selected {
        let header = &state.headers[i];

        let entry = if no_entries {
            None
        } else if i == 0 && flags.contains(MarshalFlags::OMIT_DNA) {
            Some(Cow::Owned(Entry::Text(String::new())))
        } else if is_private(i) {
            Some(Cow::Owned(Entry::redacted()))
        } else {
            Some(Cow::Borrowed(&state.entries[i]))
        };

        write_pair(
            writer,
            (!no_headers).then_some(header),
            entry.as_deref(),
        )
        .map_err(ChainError::core("marshal", i))?;
        last = state.hashes[i];
    }

    if !no_headers {
        write_hash(writer, &last).map_err(ChainError::core("marshal", state.len()))?;
    }
    Ok(())
}

fn read_state<R: Read + ?Sized>(spec: HashSpec, reader: &mut R) -> Result<(MarshalFlags, ChainState)> {
    let mut word = [0u8; 8];
    reader.read_exact(&mut word).map_err(ChainError::io("unmarshal"))?;
    let flags = MarshalFlags::from_bits(u64::from_le_bytes(word));
    if flags.version() != MarshalFlags::VERSION {
        return Err(ChainError::UnsupportedVersion(flags.version()));
    }

    reader.read_exact(&mut word).map_err(ChainError::io("unmarshal"))?;
    let count = u64::from_le_bytes(word);

    let mut state = ChainState::new(spec);
    let mut index = 0;
    while (index as u64) < count {
        let pair = read_pair(reader, flags).map_err(ChainError::core("unmarshal", index))?;
        state.add_pair(pair.header, pair.entry)?;
        index += 1;
    }

    if !flags.contains(MarshalFlags::NO_HEADERS) {
        let tip = read_hash(reader).map_err(ChainError::core("unmarshal", index))?;
        state.finish_with(tip)?;
    }
    Ok((flags, state))
}
