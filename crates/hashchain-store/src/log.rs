//! Live-append chain log.
//!
//! On-disk format is a bare sequence of pairs, with no flag word or count:
//! ```text
//! [header frame][entry frame] [header frame][entry frame] ...
//! ```
//! The file is replayed front to back on open. A record cut short is an
//! error, never skipped: the log is the chain's only durable copy.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use hashchain_core::codec::{read_full_pair, write_pair};
use hashchain_core::{Entry, HashSpec, Header};
use tracing::{debug, warn};

use crate::error::{ChainError, Result};
use crate::state::ChainState;

pub struct ChainLog {
    path: PathBuf,
    /// `None` once closed.
    file: Option<File>,
}

impl ChainLog {
    /// Open (or create) the log at `path` and replay it into a fresh state.
    pub fn open(path: &Path, spec: HashSpec) -> Result<(Self, ChainState)> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(ChainError::io("open"))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .map_err(ChainError::io("open"))?;

        let mut state = ChainState::new(spec);
        let mut reader = BufReader::new(&file);
        let mut index = 0;
        while let Some((header, entry)) =
            read_full_pair(&mut reader).map_err(ChainError::core("replay", index))?
        {
            state.add_pair(Some(header), Some(entry))?;
            index += 1;
        }
        state.finish_computed()?;

        debug!(path = %path.display(), pairs = index, "replayed chain log");

        Ok((
            Self {
                path: path.to_path_buf(),
                file: Some(file),
            },
            state,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Durably append a batch of pairs, the first taking chain index
    /// `first_index`.
    ///
    /// The batch is encoded in full before the file is touched. If the
    /// write or sync fails the file is truncated back to its prior length.
    pub fn append_pairs<'a, I>(&mut self, first_index: usize, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a Header, &'a Entry)>,
    {
        let file = self.file.as_mut().ok_or_else(|| ChainError::Io {
            op: "append",
            source: io::Error::new(io::ErrorKind::NotConnected, "chain log is closed"),
        })?;

        let mut buf = Vec::new();
        for (offset, (header, entry)) in pairs.into_iter().enumerate() {
            write_pair(&mut buf, Some(header), Some(entry))
                .map_err(ChainError::core("append", first_index + offset))?;
        }

        let prior_len = file.metadata().map_err(ChainError::io("append"))?.len();
        let written = file.write_all(&buf).and_then(|()| file.sync_data());

        if let Err(source) = written {
            warn!(
                path = %self.path.display(),
                index = first_index,
                error = %source,
                "chain log write failed; truncating"
            );
            if let Err(e) = file.set_len(prior_len) {
                warn!(path = %self.path.display(), error = %e, "chain log truncate failed");
            }
            return Err(ChainError::Io {
                op: "append",
                source,
            });
        }
        Ok(())
    }

    /// Release the file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all().map_err(ChainError::io("close"))?;
            debug!(path = %self.path.display(), "closed chain log");
        }
        Ok(())
    }
}

impl Drop for ChainLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close chain log");
        }
    }
}
