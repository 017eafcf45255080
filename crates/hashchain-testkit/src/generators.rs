//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;
use serde_json::json;

use hashchain_core::{Entry, Hash, HashSpec, Keypair};
use hashchain_store::Chain;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random hash.
pub fn hash() -> impl Strategy<Value = Hash> {
    any::<[u8; 32]>().prop_map(Hash::from_bytes)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Generate an application entry type from a small pool, so types repeat.
pub fn entry_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("post".to_string()),
        Just("comment".to_string()),
        Just("profile".to_string()),
        Just("secret".to_string()),
    ]
}

/// Generate entry content of any encoding.
pub fn entry() -> impl Strategy<Value = Entry> {
    prop_oneof![
        ".{0,64}".prop_map(Entry::Text),
        (any::<i64>(), "[a-z]{0,16}").prop_map(|(n, s)| Entry::Json(json!({"n": n, "s": s}))),
        any::<f64>().prop_map(|f| Entry::Json(json!({"f": f, "fs": [f, f / 3.0]}))),
        prop::collection::vec(any::<u8>(), 0..128).prop_map(|b| Entry::Bytes(Bytes::from(b))),
    ]
}

/// One append in a generated script.
#[derive(Debug, Clone)]
pub struct AppendOp {
    pub entry_type: String,
    pub entry: Entry,
}

/// Generate a script of up to `max_len` appends.
///
/// Every entry is made distinct by folding its position into the content,
/// since a chain rejects duplicate entry hashes.
pub fn append_script(max_len: usize) -> impl Strategy<Value = Vec<AppendOp>> {
    prop::collection::vec((entry_type(), entry()), 1..=max_len).prop_map(|ops| {
        ops.into_iter()
            .enumerate()
            .map(|(i, (entry_type, entry))| AppendOp {
                entry_type,
                entry: make_unique(i, entry),
            })
            .collect()
    })
}

fn make_unique(i: usize, entry: Entry) -> Entry {
    match entry {
        Entry::Text(s) => Entry::Text(format!("{i}:{s}")),
        Entry::Json(v) => Entry::Json(json!({"i": i, "v": v})),
        Entry::Bytes(b) => {
            let mut buf = (i as u64).to_le_bytes().to_vec();
            buf.extend_from_slice(&b);
            Entry::Bytes(Bytes::from(buf))
        }
    }
}

/// Build an in-memory chain by running `script`, with timestamps 0, 1, 2...
pub fn chain_from_script(script: &[AppendOp], keypair: &Keypair) -> Chain {
    let chain = Chain::new(HashSpec::default());
    for (i, op) in script.iter().enumerate() {
        chain
            .append(i as i64, &op.entry_type, op.entry.clone(), keypair)
            .expect("script append failed");
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashchain_core::build_header;
    use hashchain_core::LinkTips;

    proptest! {
        #[test]
        fn test_generated_chain_validates(script in append_script(24), kp in keypair()) {
            let chain = chain_from_script(&script, &kp);
            prop_assert_eq!(chain.len(), script.len());
            prop_assert!(chain.validate(false).is_ok());
        }

        #[test]
        fn test_type_top_is_last_of_type(script in append_script(24)) {
            let kp = Keypair::from_seed(&[5; 32]);
            let chain = chain_from_script(&script, &kp);

            for ty in ["post", "comment", "profile", "secret"] {
                let last = script.iter().rposition(|op| op.entry_type == ty);
                let top = chain.top_of_type(ty);
                match last {
                    Some(i) => {
                        let (_, header) = top.unwrap();
                        prop_assert_eq!(header.timestamp, i as i64);
                    }
                    None => prop_assert!(top.is_none()),
                }
            }
        }

        #[test]
        fn test_header_hash_unique_with_different_entry(
            ts in timestamp(),
            e1 in entry(),
            e2 in entry(),
        ) {
            prop_assume!(e1 != e2);

            let kp = Keypair::from_seed(&[1; 32]);
            let spec = HashSpec::default();
            let h1 = build_header(&spec, LinkTips::GENESIS, ts, "post", &e1, &kp, None).unwrap();
            let h2 = build_header(&spec, LinkTips::GENESIS, ts, "post", &e2, &kp, None).unwrap();

            prop_assert_ne!(h1.hash, h2.hash);
        }
    }
}
