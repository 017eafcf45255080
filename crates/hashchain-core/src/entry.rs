//! Entry: the content payload a header commits to.
//!
//! Content is a tagged union over encodings. The chain never interprets it
//! beyond producing stable bytes for hashing and framing.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Hash, HashSpec};

/// Entry type of the genesis (DNA) record.
pub const DNA_ENTRY_TYPE: &str = "%dna";
/// Entry type of the agent identity record.
pub const AGENT_ENTRY_TYPE: &str = "%agent";
/// Entry type of the public key record.
pub const KEY_ENTRY_TYPE: &str = "%key";
/// Entry type of a migration record.
pub const MIGRATE_ENTRY_TYPE: &str = "%migrate";

/// Content that replaces private entries in redacted exports.
pub const PRIVATE_ENTRY_REDACTED: &str = "%%PRIVATE ENTRY REDACTED%%";

mod tags {
    pub const TEXT: u8 = 0x01;
    pub const JSON: u8 = 0x02;
    pub const BYTES: u8 = 0x03;
}

/// Entry content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Entry {
    /// UTF-8 text.
    Text(String),
    /// A structured JSON document.
    Json(serde_json::Value),
    /// Opaque bytes whose schema the chain does not need to understand.
    Bytes(Bytes),
}

impl Entry {
    /// The fixed sentinel used for redacted entries.
    pub fn redacted() -> Self {
        Entry::Text(PRIVATE_ENTRY_REDACTED.to_string())
    }

    /// The encoding tag written in front of the content bytes.
    pub fn tag(&self) -> u8 {
        match self {
            Entry::Text(_) => tags::TEXT,
            Entry::Json(_) => tags::JSON,
            Entry::Bytes(_) => tags::BYTES,
        }
    }

    /// The content bytes, without the tag.
    pub fn content_bytes(&self) -> Result<Vec<u8>, CoreError> {
        match self {
            Entry::Text(s) => Ok(s.as_bytes().to_vec()),
            Entry::Json(v) => serde_json::to_vec(v).map_err(|e| CoreError::Encoding(e.to_string())),
            Entry::Bytes(b) => Ok(b.to_vec()),
        }
    }

    /// Serialized form used for hashing: `tag || content`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let content = self.content_bytes()?;
        let mut buf = Vec::with_capacity(content.len() + 1);
        buf.push(self.tag());
        buf.extend_from_slice(&content);
        Ok(buf)
    }

    /// Rebuild an entry from its tag and content bytes.
    pub fn from_parts(tag: u8, content: Vec<u8>) -> Result<Self, CoreError> {
        match tag {
            tags::TEXT => String::from_utf8(content)
                .map(Entry::Text)
                .map_err(|e| CoreError::MalformedEntry(e.to_string())),
            tags::JSON => serde_json::from_slice(&content)
                .map(Entry::Json)
                .map_err(|e| CoreError::MalformedEntry(e.to_string())),
            tags::BYTES => Ok(Entry::Bytes(Bytes::from(content))),
            other => Err(CoreError::UnknownEntryTag(other)),
        }
    }

    /// `Sum(to_bytes())`: the value a header stores as its entry link.
    pub fn sum(&self, spec: &HashSpec) -> Result<Hash, CoreError> {
        Ok(spec.sum(&self.to_bytes()?))
    }
}

impl From<&str> for Entry {
    fn from(s: &str) -> Self {
        Entry::Text(s.to_string())
    }
}

impl From<String> for Entry {
    fn from(s: String) -> Self {
        Entry::Text(s)
    }
}

impl From<serde_json::Value> for Entry {
    fn from(v: serde_json::Value) -> Self {
        Entry::Json(v)
    }
}

impl From<Vec<u8>> for Entry {
    fn from(b: Vec<u8>) -> Self {
        Entry::Bytes(Bytes::from(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_from_parts_inverts_to_bytes() {
        for entry in [
            Entry::from("hello"),
            Entry::Json(json!({"b": 1, "a": [true, null]})),
            Entry::from(vec![0u8, 1, 2, 255]),
        ] {
            let bytes = entry.to_bytes().unwrap();
            let rebuilt = Entry::from_parts(bytes[0], bytes[1..].to_vec()).unwrap();
            assert_eq!(entry, rebuilt);
        }
    }

    #[test]
    fn test_tag_distinguishes_same_content() {
        let spec = HashSpec::default();
        let text = Entry::from("abc");
        let raw = Entry::from(b"abc".to_vec());
        assert_ne!(text.sum(&spec).unwrap(), raw.sum(&spec).unwrap());
    }

    #[test]
    fn test_json_bytes_are_stable() {
        let a = Entry::Json(json!({"z": 1, "a": 2}));
        let b = Entry::Json(json!({"a": 2, "z": 1}));
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }

    #[test]
    fn test_json_floats_survive_reparse() {
        let spec = HashSpec::default();
        for x in [
            1.0715660391465826e-75,
            0.1,
            2.2250738585072014e-308,
            5e-324,
            1.7976931348623157e308,
            -3.0,
        ] {
            let entry = Entry::Json(json!({"f": x, "nested": [x, {"g": x}]}));
            let bytes = entry.to_bytes().unwrap();
            let rebuilt = Entry::from_parts(bytes[0], bytes[1..].to_vec()).unwrap();

            assert_eq!(rebuilt.to_bytes().unwrap(), bytes, "bytes drifted for {x:e}");
            assert_eq!(rebuilt.sum(&spec).unwrap(), entry.sum(&spec).unwrap());
        }
    }

    proptest! {
        #[test]
        fn prop_json_float_hash_is_stable(x in any::<f64>()) {
            prop_assume!(x.is_finite());
            let spec = HashSpec::default();
            let entry = Entry::Json(json!({"v": x}));
            let bytes = entry.to_bytes().unwrap();
            let rebuilt = Entry::from_parts(bytes[0], bytes[1..].to_vec()).unwrap();
            prop_assert_eq!(rebuilt.sum(&spec).unwrap(), entry.sum(&spec).unwrap());
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(
            Entry::from_parts(0x7f, vec![]),
            Err(CoreError::UnknownEntryTag(0x7f))
        ));
    }

    #[test]
    fn test_invalid_utf8_text() {
        assert!(matches!(
            Entry::from_parts(0x01, vec![0xff, 0xfe]),
            Err(CoreError::MalformedEntry(_))
        ));
    }

    #[test]
    fn test_redacted_sentinel() {
        assert_eq!(Entry::redacted(), Entry::Text(PRIVATE_ENTRY_REDACTED.into()));
    }
}
