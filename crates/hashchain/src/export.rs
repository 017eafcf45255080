//! Presentation views over a chain: text dump, JSON document, GraphViz dot.
//!
//! These are one-way projections for humans and tooling. Use
//! [`Chain::marshal`](hashchain_store::Chain::marshal) for anything that has
//! to be read back.

use std::fmt::Write as _;

use hashchain_core::{Entry, Hash, HashSpec, Header, AGENT_ENTRY_TYPE, DNA_ENTRY_TYPE, KEY_ENTRY_TYPE};
use hashchain_store::Chain;
use serde_json::{json, Map, Value};

use crate::error::Result;

/// Text dump of every pair from index `start`, oldest first.
pub fn dump(chain: &Chain, start: usize) -> Result<String> {
    let spec = chain.hash_spec();
    let mut out = String::new();
    chain.for_each_from(start, |_, hash, header, entry| -> Result<()> {
        writeln!(out, "{}:{} @ {}", header.entry_type, spec.encode(hash), header.timestamp)?;
        writeln!(out, "    Sig: {}", header.signature)?;
        writeln!(out, "    Next Header: {}", spec.encode(&header.header_link))?;
        writeln!(out, "    Next {}: {}", header.entry_type, spec.encode(&header.type_link))?;
        writeln!(out, "    Entry: {}", spec.encode(&header.entry_link))?;
        if let Some(change) = &header.change {
            writeln!(out, "    Change: {}", spec.encode(change))?;
        }
        writeln!(out, "       {}", content_text(entry))?;
        writeln!(out)?;
        Ok(())
    })?;
    Ok(out)
}

/// JSON document of every pair from index `start`.
///
/// `%dna`, `%agent` and `%key` records appear as top-level keys; all other
/// records go, in order, into an `"entries"` array.
pub fn to_json(chain: &Chain, start: usize) -> Result<Value> {
    let spec = chain.hash_spec();
    let mut doc = Map::new();
    let mut entries = Vec::new();

    chain.for_each_from(start, |_, hash, header, entry| -> Result<()> {
        let item = json!({
            "header": header_json(&spec, hash, header),
            "content": content_json(entry),
        });
        match header.entry_type.as_str() {
            DNA_ENTRY_TYPE | AGENT_ENTRY_TYPE | KEY_ENTRY_TYPE => {
                doc.insert(header.entry_type.clone(), item);
            }
            _ => entries.push(item),
        }
        Ok(())
    })?;

    if !entries.is_empty() {
        doc.insert("entries".to_string(), Value::Array(entries));
    }
    Ok(Value::Object(doc))
}

/// [`to_json`], pretty-printed.
pub fn to_json_string(chain: &Chain, start: usize) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_json(chain, start)?)?)
}

/// GraphViz description of every pair from index `start`.
pub fn to_dot(chain: &Chain, start: usize) -> Result<String> {
    let spec = chain.hash_spec();
    let mut out = String::new();

    out.push_str("digraph chain {\n");
    out.push_str("graph [splines=line];\n");
    out.push_str(
        "node [shape=record fontname=\"Arial\",fontsize=\"10\",style=\"rounded, filled\",\
         penwidth=2,fontcolor=\"#c5c5c5\",color=\"#8d00ff\",fillcolor=\"#181818\"];\n",
    );
    out.push_str("edge [penwidth=2, color=\"#8d00ff\"];\n");

    chain.for_each_from(start, |i, hash, header, entry| -> Result<()> {
        let genesis = if i == 0 { ": GENESIS" } else { "" };
        writeln!(out, "header{i} [label=<{{HEADER {i}{genesis}|")?;
        writeln!(out, "{{Type|{}}}|", header.entry_type)?;
        writeln!(out, "{{Hash|{}}}|", spec.encode(hash))?;
        writeln!(out, "{{Timestamp|{}}}|", header.timestamp)?;
        writeln!(out, "{{Next Header|{}}}|", spec.encode(&header.header_link))?;
        writeln!(out, "{{Next|{}: {}}}|", header.entry_type, spec.encode(&header.type_link))?;
        writeln!(out, "{{Entry|{}}}", spec.encode(&header.entry_link))?;
        out.push_str("}>];\n");

        let (label, body) = match i {
            0 => ("DNA".to_string(), "See dna.json".to_string()),
            1 => ("AGENT ID".to_string(), dot_escape(&content_text(entry))),
            _ => (format!("ENTRY {i}"), dot_escape(&content_text(entry))),
        };
        writeln!(out, "content{i} [label=<{{{label}|{body}}}>];")?;

        // Edges only join pairs rendered under the same read lock.
        if i > start {
            writeln!(out, "header{}->header{i};", i - 1)?;
        }
        writeln!(out, "header{i}->content{i};")?;
        Ok(())
    })?;

    out.push('}');
    Ok(out)
}

fn header_json(spec: &HashSpec, hash: &Hash, header: &Header) -> Value {
    let mut value = json!({
        "type": header.entry_type,
        "signature": header.signature.to_hex(),
        "hash": spec.encode(hash),
        "time": header.timestamp,
        "nextHeader": spec.encode(&header.header_link),
        "next": format!("{}: {}", header.entry_type, spec.encode(&header.type_link)),
        "entry": spec.encode(&header.entry_link),
    });
    if let (Some(change), Value::Object(map)) = (&header.change, &mut value) {
        map.insert("change".into(), Value::String(spec.encode(change)));
    }
    value
}

/// Structured content is embedded as-is. Bytes holding a JSON document are
/// embedded as that document; any other content becomes a string.
fn content_json(entry: &Entry) -> Value {
    match entry {
        Entry::Text(s) => Value::String(s.clone()),
        Entry::Json(v) => v.clone(),
        Entry::Bytes(b) => serde_json::from_slice(b)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(b).into_owned())),
    }
}

fn content_text(entry: &Entry) -> String {
    match entry {
        Entry::Text(s) => s.clone(),
        Entry::Json(v) => v.to_string(),
        Entry::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => s.to_string(),
            Err(_) => hex::encode(b),
        },
    }
}

/// Escape record delimiters so JSON content renders inside a dot record.
fn dot_escape(body: &str) -> String {
    body.replace("{\"", "\\{\"")
        .replace("\"}", "\"\\}")
        .replace(":[", ":[<br/>")
        .replace("]}", "]\\}")
        .replace(',', ",<br/>")
}
