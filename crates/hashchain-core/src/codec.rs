//! Binary framing for headers, entries, hashes and pair streams.
//!
//! On-wire layout (all integers little-endian):
//! ```text
//! header frame : [len: u64][canonical CBOR header]
//! entry frame  : [tag: u8][len: u64][content bytes]
//! hash frame   : [32 digest bytes]
//! pair         : [header frame]? [entry frame]?
//! ```
//! Which halves of a pair are present is decided by the stream's
//! [`MarshalFlags`].

use std::io::{self, Read, Write};

use crate::canonical::decode_header;
use crate::entry::Entry;
use crate::error::CoreError;
use crate::header::Header;
use crate::types::Hash;

/// Upper bound on a single header or entry frame. Enforced when building,
/// writing and reading, so anything written can be read back.
pub const MAX_FRAME_LEN: u64 = 64 * 1024 * 1024;

/// Fail with `FrameTooLarge` when `len` exceeds [`MAX_FRAME_LEN`].
pub fn check_frame_len(len: u64) -> Result<(), CoreError> {
    if len > MAX_FRAME_LEN {
        return Err(CoreError::FrameTooLarge {
            len,
            limit: MAX_FRAME_LEN,
        });
    }
    Ok(())
}

/// The stream flag word.
///
/// Low bits select what a stream omits. The top byte carries the stream
/// format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MarshalFlags(u64);

impl MarshalFlags {
    pub const NONE: Self = Self(0x00);
    /// Headers are omitted from every pair and no trailing hash is written.
    pub const NO_HEADERS: Self = Self(0x01);
    /// Entries are omitted from every pair.
    pub const NO_ENTRIES: Self = Self(0x02);
    /// The genesis entry's content is blanked.
    pub const OMIT_DNA: Self = Self(0x04);
    /// Entries may be redacted. Set by the writer whenever it redacted one.
    pub const NO_PRIVATE: Self = Self(0x08);
    /// Pairs were filtered by entry type, so consecutive headers need not
    /// link. Set by the writer, never honored as a request.
    pub const SELECTIVE: Self = Self(0x10);

    /// The stream format version written by this crate.
    pub const VERSION: u8 = 0;

    const VERSION_SHIFT: u32 = 56;
    const KNOWN_BITS: u64 = 0x1f;

    /// Build from the raw word.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// The raw word.
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Check whether every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `self` with every bit of `other` cleared.
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// The format version carried in the top byte.
    pub const fn version(self) -> u8 {
        (self.0 >> Self::VERSION_SHIFT) as u8
    }

    /// Flags with unknown low bits cleared and the current version stamped.
    pub const fn normalized(self) -> Self {
        Self((self.0 & Self::KNOWN_BITS) | ((Self::VERSION as u64) << Self::VERSION_SHIFT))
    }
}

impl std::ops::BitOr for MarshalFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One (header, entry) record of a stream. Either half may be absent when
/// the stream's flags omit it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainPair {
    pub header: Option<Header>,
    pub entry: Option<Entry>,
}

pub fn write_u64<W: Write + ?Sized>(writer: &mut W, n: u64) -> Result<(), CoreError> {
    writer.write_all(&n.to_le_bytes())?;
    Ok(())
}

pub fn read_u64<R: Read + ?Sized>(reader: &mut R) -> Result<u64, CoreError> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_frame<R: Read + ?Sized>(reader: &mut R, len: u64) -> Result<Vec<u8>, CoreError> {
    check_frame_len(len)?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Fill `buf`, returning `false` if the reader was already at end of stream.
/// A stream ending part-way through `buf` is an error.
fn fill_or_eof<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<bool, CoreError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(CoreError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated record",
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

pub fn write_header<W: Write + ?Sized>(writer: &mut W, header: &Header) -> Result<(), CoreError> {
    let bytes = header.to_bytes()?;
    check_frame_len(bytes.len() as u64)?;
    write_u64(writer, bytes.len() as u64)?;
    writer.write_all(&bytes)?;
    Ok(())
}

pub fn read_header<R: Read + ?Sized>(reader: &mut R) -> Result<Header, CoreError> {
    let len = read_u64(reader)?;
    decode_header(&read_frame(reader, len)?)
}

pub fn write_entry<W: Write + ?Sized>(writer: &mut W, entry: &Entry) -> Result<(), CoreError> {
    let content = entry.content_bytes()?;
    check_frame_len(content.len() as u64)?;
    writer.write_all(&[entry.tag()])?;
    write_u64(writer, content.len() as u64)?;
    writer.write_all(&content)?;
    Ok(())
}

pub fn read_entry<R: Read + ?Sized>(reader: &mut R) -> Result<Entry, CoreError> {
    let mut tag = [0u8; 1];
    reader.read_exact(&mut tag)?;
    let len = read_u64(reader)?;
    Entry::from_parts(tag[0], read_frame(reader, len)?)
}

pub fn write_hash<W: Write + ?Sized>(writer: &mut W, hash: &Hash) -> Result<(), CoreError> {
    writer.write_all(&hash.0)?;
    Ok(())
}

pub fn read_hash<R: Read + ?Sized>(reader: &mut R) -> Result<Hash, CoreError> {
    let mut buf = [0u8; 32];
    reader.read_exact(&mut buf)?;
    Ok(Hash(buf))
}

/// Write whichever halves of a pair are present.
pub fn write_pair<W: Write + ?Sized>(
    writer: &mut W,
    header: Option<&Header>,
    entry: Option<&Entry>,
) -> Result<(), CoreError> {
    if let Some(header) = header {
        write_header(writer, header)?;
    }
    if let Some(entry) = entry {
        write_entry(writer, entry)?;
    }
    Ok(())
}

/// Read one pair laid out according to `flags`.
pub fn read_pair<R: Read + ?Sized>(reader: &mut R, flags: MarshalFlags) -> Result<ChainPair, CoreError> {
    let mut pair = ChainPair::default();
    if !flags.contains(MarshalFlags::NO_HEADERS) {
        pair.header = Some(read_header(reader)?);
    }
    if !flags.contains(MarshalFlags::NO_ENTRIES) {
        pair.entry = Some(read_entry(reader)?);
    }
    Ok(pair)
}

/// Read one full pair, or `None` at a clean end of stream.
///
/// Used to replay live-append logs, which carry no count.
pub fn read_full_pair<R: Read + ?Sized>(reader: &mut R) -> Result<Option<(Header, Entry)>, CoreError> {
    let mut len_buf = [0u8; 8];
    if !fill_or_eof(reader, &mut len_buf)? {
        return Ok(None);
    }
    let header = decode_header(&read_frame(reader, u64::from_le_bytes(len_buf))?)?;
    let entry = read_entry(reader)?;
    Ok(Some((header, entry)))
}
