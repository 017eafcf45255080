//! Canonical CBOR encoding of headers.
//!
//! Headers are hashed and signed over these bytes, so the encoding must be
//! byte-identical everywhere. It follows RFC 8949 Core Deterministic
//! Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)

use ciborium::value::Value;

use crate::crypto::Signature;
use crate::error::CoreError;
use crate::header::Header;
use crate::types::Hash;

/// Header field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const ENTRY_TYPE: u64 = 0;
    pub const TIMESTAMP: u64 = 1;
    pub const ENTRY_LINK: u64 = 2;
    pub const HEADER_LINK: u64 = 3;
    pub const TYPE_LINK: u64 = 4;
    pub const CHANGE: u64 = 5;
    pub const SIGNATURE: u64 = 6;
}

/// Encode a full header, signature included. `Header::sum` hashes these bytes.
pub fn canonical_header_bytes(header: &Header) -> Result<Vec<u8>, CoreError> {
    encode_cbor_value_canonical(&header_to_cbor_value(header, true))
}

/// Encode a header without its signature: the message handed to the signer.
pub fn signing_bytes(header: &Header) -> Result<Vec<u8>, CoreError> {
    encode_cbor_value_canonical(&header_to_cbor_value(header, false))
}

fn key(k: u64) -> Value {
    Value::Integer(k.into())
}

fn header_to_cbor_value(header: &Header, with_signature: bool) -> Value {
    let mut entries = Vec::with_capacity(7);

    entries.push((key(keys::ENTRY_TYPE), Value::Text(header.entry_type.clone())));
    entries.push((key(keys::TIMESTAMP), Value::Integer(header.timestamp.into())));
    entries.push((key(keys::ENTRY_LINK), Value::Bytes(header.entry_link.0.to_vec())));
    entries.push((key(keys::HEADER_LINK), Value::Bytes(header.header_link.0.to_vec())));
    entries.push((key(keys::TYPE_LINK), Value::Bytes(header.type_link.0.to_vec())));

    let change = match &header.change {
        Some(hash) => Value::Bytes(hash.0.to_vec()),
        None => Value::Null,
    };
    entries.push((key(keys::CHANGE), change));

    if with_signature {
        entries.push((key(keys::SIGNATURE), Value::Bytes(header.signature.0.clone())));
    }

    Value::Map(entries)
}

/// Encode a CBOR Value to canonical bytes.
fn encode_cbor_value_canonical(value: &Value) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_uint(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::Encoding(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => return Err(CoreError::Encoding("unsupported CBOR value type".into())),
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n = i128::from(i);
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<(), CoreError> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

/// Decode a header from its canonical bytes.
pub fn decode_header(bytes: &[u8]) -> Result<Header, CoreError> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))?;
    cbor_value_to_header(&value)
}

fn cbor_value_to_header(value: &Value) -> Result<Header, CoreError> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedHeader("expected map".into())),
    };

    let get = |k: u64| -> Option<&Value> {
        map.iter()
            .find(|(mk, _)| matches!(mk, Value::Integer(i) if i128::from(*i) == i128::from(k)))
            .map(|(_, v)| v)
    };

    let hash_field = |k: u64, name: &str| -> Result<Hash, CoreError> {
        match get(k) {
            Some(Value::Bytes(b)) if b.len() == 32 => Hash::try_from(b.as_slice()),
            _ => Err(CoreError::MalformedHeader(format!("invalid {name}"))),
        }
    };

    let entry_type = match get(keys::ENTRY_TYPE) {
        Some(Value::Text(s)) => s.clone(),
        _ => return Err(CoreError::MalformedHeader("missing entry type".into())),
    };

    let timestamp = match get(keys::TIMESTAMP) {
        Some(Value::Integer(i)) => i64::try_from(i128::from(*i))
            .map_err(|_| CoreError::MalformedHeader("timestamp out of range".into()))?,
        _ => return Err(CoreError::MalformedHeader("missing timestamp".into())),
    };

    let entry_link = hash_field(keys::ENTRY_LINK, "entry link")?;
    let header_link = hash_field(keys::HEADER_LINK, "header link")?;
    let type_link = hash_field(keys::TYPE_LINK, "type link")?;

    let change = match get(keys::CHANGE) {
        Some(Value::Bytes(b)) if b.len() == 32 => Some(Hash::try_from(b.as_slice())?),
        Some(Value::Null) | None => None,
        _ => return Err(CoreError::MalformedHeader("invalid change".into())),
    };

    let signature = match get(keys::SIGNATURE) {
        Some(Value::Bytes(b)) => Signature(b.clone()),
        _ => return Err(CoreError::MalformedHeader("missing signature".into())),
    };

    Ok(Header {
        entry_type,
        timestamp,
        entry_link,
        header_link,
        type_link,
        change,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_header() -> Header {
        Header {
            entry_type: "post".into(),
            timestamp: 1_736_870_400_000,
            entry_link: Hash::from_bytes([1; 32]),
            header_link: Hash::from_bytes([2; 32]),
            type_link: Hash::NULL,
            change: None,
            signature: Signature(vec![9; 64]),
        }
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let header = sample_header();
        assert_eq!(
            canonical_header_bytes(&header).unwrap(),
            canonical_header_bytes(&header).unwrap()
        );
    }

    #[test]
    fn test_signing_bytes_exclude_signature() {
        let mut header = sample_header();
        let before = signing_bytes(&header).unwrap();
        header.signature = Signature(vec![1; 64]);
        assert_eq!(before, signing_bytes(&header).unwrap());
        assert!(before.len() < canonical_header_bytes(&header).unwrap().len());
    }

    #[test]
    fn test_header_roundtrip_with_change() {
        let mut header = sample_header();
        header.change = Some(Hash::from_bytes([0xee; 32]));
        header.timestamp = -5;
        let decoded = decode_header(&canonical_header_bytes(&header).unwrap()).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut buf = Vec::new();
        let entries = vec![
            (key(6), Value::Integer(60.into())),
            (key(0), Value::Integer(0.into())),
        ];
        encode_map_canonical(&mut buf, &entries).unwrap();
        assert_eq!(buf, vec![0xa2, 0x00, 0x00, 0x06, 0x18, 60]);
    }

    #[test]
    fn test_decode_rejects_short_link() {
        let mut bytes = Vec::new();
        let value = Value::Map(vec![
            (key(0), Value::Text("t".into())),
            (key(1), Value::Integer(1.into())),
            (key(2), Value::Bytes(vec![1, 2, 3])),
        ]);
        encode_value_to(&mut bytes, &value).unwrap();
        assert!(matches!(
            decode_header(&bytes),
            Err(CoreError::MalformedHeader(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            entry_type in "[a-z%]{0,12}",
            timestamp in any::<i64>(),
            links in any::<[[u8; 32]; 3]>(),
            change in proptest::option::of(any::<[u8; 32]>()),
            signature in prop::collection::vec(any::<u8>(), 0..80),
        ) {
            let header = Header {
                entry_type,
                timestamp,
                entry_link: Hash::from_bytes(links[0]),
                header_link: Hash::from_bytes(links[1]),
                type_link: Hash::from_bytes(links[2]),
                change: change.map(Hash::from_bytes),
                signature: Signature(signature),
            };
            let bytes = canonical_header_bytes(&header).unwrap();
            prop_assert_eq!(decode_header(&bytes).unwrap(), header);
        }
    }
}
