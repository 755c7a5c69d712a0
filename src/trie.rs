//! Prefix trie over indexed tokens.
//!
//! The trie mirrors the key set of the persisted search index and exists
//! for one reason: prefix lookup. It is serialized in two forms:
//!
//! - a **private** binary form (`search.trie`) that round-trips exactly and
//!   is reloaded at the start of every incremental scan;
//! - a **public** form (`trie_index.js`) for the browser-side search box: a
//!   nested JSON object keyed by single characters, with `"$": 1` marking
//!   the end of a complete token, assigned to a `trie_index` variable so it
//!   can be loaded with a plain script tag.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// File magic for the private serialization
const TRIE_MAGIC: &[u8; 4] = b"DXTR";
/// Private format version
const TRIE_VERSION: u32 = 1;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: BTreeMap<u8, TrieNode>,
    terminal: bool,
}

/// Set of indexed tokens structured for prefix lookup
#[derive(Debug, Clone, Default)]
pub struct Trie {
    root: TrieNode,
    len: usize,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens in the trie
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a token. Returns false if it was already present.
    pub fn insert(&mut self, token: &str) -> bool {
        let mut node = &mut self.root;
        for &byte in token.as_bytes() {
            node = node.children.entry(byte).or_default();
        }
        if node.terminal {
            return false;
        }
        node.terminal = true;
        self.len += 1;
        true
    }

    /// Remove a token, pruning branches left without terminals.
    /// Removing an absent token is a no-op and returns false.
    pub fn remove(&mut self, token: &str) -> bool {
        if !remove_rec(&mut self.root, token.as_bytes()) {
            return false;
        }
        self.len -= 1;
        true
    }

    pub fn contains(&self, token: &str) -> bool {
        self.walk(token).is_some_and(|node| node.terminal)
    }

    /// All tokens, in lexicographic byte order
    pub fn tokens(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len);
        let mut buf = Vec::new();
        collect(&self.root, &mut buf, usize::MAX, &mut out);
        out
    }

    /// Up to `limit` tokens starting with `prefix`, in lexicographic order
    pub fn complete(&self, prefix: &str, limit: usize) -> Vec<String> {
        let Some(node) = self.walk(prefix) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut buf = prefix.as_bytes().to_vec();
        collect(node, &mut buf, limit, &mut out);
        out
    }

    fn walk(&self, prefix: &str) -> Option<&TrieNode> {
        let mut node = &self.root;
        for &byte in prefix.as_bytes() {
            node = node.children.get(&byte)?;
        }
        Some(node)
    }

    /// Reload a trie from its private serialization
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open trie file: {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != TRIE_MAGIC {
            bail!("Not a trie file: {}", path.display());
        }
        let mut version = [0u8; 4];
        reader.read_exact(&mut version)?;
        let version = u32::from_le_bytes(version);
        if version != TRIE_VERSION {
            bail!("Unsupported trie format version {}", version);
        }

        let mut len = 0;
        let root = read_node(&mut reader, &mut len)
            .with_context(|| format!("Corrupt trie file: {}", path.display()))?;
        Ok(Self { root, len })
    }

    /// Persist both serializations: the reloadable private form and the
    /// client-consumed public form.
    pub fn to_file(&self, private_path: &Path, public_path: &Path) -> Result<()> {
        let file = File::create(private_path)
            .with_context(|| format!("Failed to write trie file: {}", private_path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(TRIE_MAGIC)?;
        writer.write_all(&TRIE_VERSION.to_le_bytes())?;
        write_node(&mut writer, &self.root)?;
        writer.flush()?;

        let file = File::create(public_path).with_context(|| {
            format!("Failed to write trie index: {}", public_path.display())
        })?;
        let mut writer = BufWriter::new(file);
        writer.write_all(b"var trie_index = ")?;
        serde_json::to_writer(&mut writer, &public_node(&self.root))?;
        writer.write_all(b";\n")?;
        writer.flush()?;

        Ok(())
    }
}

fn remove_rec(node: &mut TrieNode, suffix: &[u8]) -> bool {
    match suffix.split_first() {
        None => {
            let was_terminal = node.terminal;
            node.terminal = false;
            was_terminal
        }
        Some((&byte, rest)) => {
            let Some(child) = node.children.get_mut(&byte) else {
                return false;
            };
            let removed = remove_rec(child, rest);
            if removed && !child.terminal && child.children.is_empty() {
                node.children.remove(&byte);
            }
            removed
        }
    }
}

fn collect(node: &TrieNode, buf: &mut Vec<u8>, limit: usize, out: &mut Vec<String>) {
    if out.len() >= limit {
        return;
    }
    if node.terminal {
        // Edges only ever come from token strings, so this is valid UTF-8
        out.push(String::from_utf8_lossy(buf).into_owned());
    }
    for (&byte, child) in &node.children {
        buf.push(byte);
        collect(child, buf, limit, out);
        buf.pop();
        if out.len() >= limit {
            return;
        }
    }
}

/// Preorder node encoding: flags byte, varint child count, then each child
/// as an edge byte followed by the child node.
fn write_node<W: Write>(writer: &mut W, node: &TrieNode) -> Result<()> {
    writer.write_all(&[node.terminal as u8])?;
    write_varint(writer, node.children.len() as u32)?;
    for (&byte, child) in &node.children {
        writer.write_all(&[byte])?;
        write_node(writer, child)?;
    }
    Ok(())
}

fn read_node<R: Read>(reader: &mut R, len: &mut usize) -> Result<TrieNode> {
    let mut flags = [0u8; 1];
    reader.read_exact(&mut flags)?;
    if flags[0] > 1 {
        bail!("Invalid node flags: {:#x}", flags[0]);
    }
    let terminal = flags[0] == 1;
    if terminal {
        *len += 1;
    }

    let child_count = read_varint(reader)?;
    let mut children = BTreeMap::new();
    for _ in 0..child_count {
        let mut edge = [0u8; 1];
        reader.read_exact(&mut edge)?;
        let child = read_node(reader, len)?;
        children.insert(edge[0], child);
    }
    Ok(TrieNode { children, terminal })
}

fn write_varint<W: Write>(writer: &mut W, mut value: u32) -> Result<()> {
    loop {
        if value < 0x80 {
            writer.write_all(&[value as u8])?;
            return Ok(());
        }
        writer.write_all(&[(value as u8) | 0x80])?;
        value >>= 7;
    }
}

fn read_varint<R: Read>(reader: &mut R) -> Result<u32> {
    let mut result: u32 = 0;
    let mut shift = 0;
    loop {
        if shift >= 32 {
            bail!("Varint overflow");
        }
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        result |= ((byte[0] & 0x7F) as u32) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Public encoding: one JSON object per node, single-character keys for
/// edges, `"$": 1` on terminals.
fn public_node(node: &TrieNode) -> Value {
    let mut map = Map::new();
    if node.terminal {
        map.insert("$".to_string(), Value::from(1));
    }
    for (&byte, child) in &node.children {
        // The token grammar is ASCII, so every edge byte is one character
        map.insert((byte as char).to_string(), public_node(child));
    }
    Value::Object(map)
}
