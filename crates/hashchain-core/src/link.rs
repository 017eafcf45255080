//! Hash-link builder: constructs the next signed header for a chain tip.
//!
//! Building a header never touches chain state. The caller supplies the
//! tips it read and decides whether to append the result.

use crate::codec::check_frame_len;
use crate::crypto::{Signature, Signer};
use crate::entry::Entry;
use crate::error::CoreError;
use crate::header::Header;
use crate::types::{Hash, HashSpec};

/// The predecessor hashes a new header links to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkTips {
    /// Hash of the chain tip, or null for an empty chain.
    pub header: Hash,
    /// Hash of the latest header of the entry's type, or null.
    pub type_header: Hash,
}

impl LinkTips {
    /// Tips of an empty chain.
    pub const GENESIS: Self = Self {
        header: Hash::NULL,
        type_header: Hash::NULL,
    };
}

/// A freshly built header together with the hashes computed along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedHeader {
    pub header: Header,
    /// `Sum` of the signed header.
    pub hash: Hash,
    /// `Sum` of the entry, equal to `header.entry_link`.
    pub entry_hash: Hash,
}

/// Build and sign the header committing `entry` on top of `tips`.
///
/// Two calls with identical inputs and a deterministic signer produce
/// byte-identical headers. An entry or header too large to frame is
/// rejected with `FrameTooLarge`; oversized entries before signing.
pub fn build_header(
    spec: &HashSpec,
    tips: LinkTips,
    timestamp: i64,
    entry_type: &str,
    entry: &Entry,
    signer: &dyn Signer,
    change: Option<Hash>,
) -> Result<LinkedHeader, CoreError> {
    let entry_bytes = entry.to_bytes()?;
    // Tag byte excluded: the entry frame length counts content only.
    check_frame_len(entry_bytes.len() as u64 - 1)?;
    check_frame_len(entry_type.len() as u64)?;
    let entry_hash = spec.sum(&entry_bytes);

    let mut header = Header {
        entry_type: entry_type.to_string(),
        timestamp,
        entry_link: entry_hash,
        header_link: tips.header,
        type_link: tips.type_header,
        change,
        signature: Signature::default(),
    };

    let message = header.signing_bytes()?;
    header.signature = signer.sign(&message)?;

    let header_bytes = header.to_bytes()?;
    check_frame_len(header_bytes.len() as u64)?;
    let hash = spec.sum(&header_bytes);
    Ok(LinkedHeader {
        header,
        hash,
        entry_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::error::SignError;

    struct FailingSigner;

    impl Signer for FailingSigner {
        fn sign(&self, _message: &[u8]) -> Result<Signature, SignError> {
            Err(SignError::new("hsm offline"))
        }
    }

    fn tips() -> LinkTips {
        LinkTips {
            header: Hash::from_bytes([1; 32]),
            type_header: Hash::from_bytes([2; 32]),
        }
    }

    #[test]
    fn test_build_header_links() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let spec = HashSpec::default();
        let entry = Entry::from("hello");

        let linked = build_header(&spec, tips(), 1000, "post", &entry, &keypair, None).unwrap();

        assert_eq!(linked.header.entry_type, "post");
        assert_eq!(linked.header.header_link, Hash::from_bytes([1; 32]));
        assert_eq!(linked.header.type_link, Hash::from_bytes([2; 32]));
        assert_eq!(linked.header.entry_link, entry.sum(&spec).unwrap());
        assert_eq!(linked.entry_hash, linked.header.entry_link);
        assert_eq!(linked.hash, linked.header.sum(&spec).unwrap());
    }

    #[test]
    fn test_signature_covers_signing_bytes() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let linked = build_header(
            &HashSpec::default(),
            LinkTips::GENESIS,
            1000,
            "post",
            &Entry::from("x"),
            &keypair,
            Some(Hash::from_bytes([3; 32])),
        )
        .unwrap();

        let message = linked.header.signing_bytes().unwrap();
        keypair
            .public_key()
            .verify(&message, &linked.header.signature)
            .unwrap();
        assert!(linked.header.is_genesis());
    }

    #[test]
    fn test_build_header_deterministic() {
        let keypair = Keypair::from_seed(&[0x11; 32]);
        let spec = HashSpec::default();
        let entry = Entry::from(vec![1, 2, 3]);

        let a = build_header(&spec, tips(), 5, "t", &entry, &keypair, None).unwrap();
        let b = build_header(&spec, tips(), 5, "t", &entry, &keypair, None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.header.to_bytes().unwrap(), b.header.to_bytes().unwrap());
    }

    #[test]
    fn test_signing_failure_propagates() {
        let result = build_header(
            &HashSpec::default(),
            LinkTips::GENESIS,
            0,
            "t",
            &Entry::from("x"),
            &FailingSigner,
            None,
        );
        match result {
            Err(CoreError::Signing(e)) => assert_eq!(e, SignError::new("hsm offline")),
            other => panic!("expected signing error, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_entry_rejected_before_signing() {
        let entry = Entry::from(vec![7u8; crate::codec::MAX_FRAME_LEN as usize + 1]);
        let result = build_header(
            &HashSpec::default(),
            LinkTips::GENESIS,
            0,
            "blob",
            &entry,
            &FailingSigner,
            None,
        );
        assert!(matches!(result, Err(CoreError::FrameTooLarge { .. })));
    }
}
