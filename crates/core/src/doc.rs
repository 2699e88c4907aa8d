//! Last-writer-wins register tree
//!
//! A `TreeDoc` is a map from `/`-separated key paths to registers. Every
//! write is a `Chunk` stamped with `(lamport time, peer)`; the highest stamp
//! per key wins. The `content` subtree holds the mirrored file: text files
//! are one register at `content`, JSON objects spread over `content/<key>/..`
//! so edits to different keys survive a merge side by side.
//!
//! The version vector (`Clock`) records the highest sequence number applied
//! per peer, which makes `delta` a filter over the applied history.

use crate::clock::{Clock, PeerId, Stamp};
use crate::content::Content;
use crate::error::Result;
use crate::replica::Replica;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Root key of the mirrored file's subtree
pub const CONTENT_KEY: &str = "content";

/// Scalar stored in a register
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leaf {
    /// Plain text file body
    Text(String),
    /// Non UTF-8 file body
    Bytes(Vec<u8>),
    Null,
    Bool(bool),
    /// JSON number in its canonical textual form
    Number(String),
    /// JSON string
    Str(String),
    /// Empty JSON object
    Object,
    /// JSON array, kept whole
    Array(String),
}

/// A single register write
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub peer: PeerId,
    /// Per-peer sequence number, starting at 1
    pub seq: u64,
    /// Lamport time
    pub time: u64,
    pub key: String,
    /// `None` removes the key
    pub value: Option<Leaf>,
}

impl Chunk {
    pub fn stamp(&self) -> Stamp {
        Stamp {
            time: self.time,
            peer: self.peer,
        }
    }
}

#[derive(Clone, Debug)]
struct Register {
    stamp: Stamp,
    value: Option<Leaf>,
}

/// Replicated register tree
#[derive(Clone, Debug)]
pub struct TreeDoc {
    peer: PeerId,
    time: u64,
    clock: Clock,
    registers: BTreeMap<String, Register>,
    history: Vec<Chunk>,
}

impl Default for TreeDoc {
    fn default() -> Self {
        Self::with_peer(PeerId::random())
    }
}

impl TreeDoc {
    /// Create an empty document writing as `peer`
    pub fn with_peer(peer: PeerId) -> Self {
        Self {
            peer,
            time: 0,
            clock: Clock::origin(),
            registers: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    /// Number of chunks applied so far
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Live value at `key`
    pub fn get(&self, key: &str) -> Option<&Leaf> {
        self.registers.get(key).and_then(|r| r.value.as_ref())
    }

    /// Write `value` at `key` as a local change
    ///
    /// Returns `false` without producing a chunk when the key already holds
    /// that value.
    pub fn put(&mut self, key: &str, value: Option<Leaf>) -> bool {
        if self.get(key) == value.as_ref() {
            return false;
        }

        let chunk = Chunk {
            peer: self.peer,
            seq: self.clock.get(self.peer) + 1,
            time: self.time + 1,
            key: key.to_string(),
            value,
        };
        self.apply_one(chunk);
        true
    }

    fn apply_one(&mut self, chunk: Chunk) {
        if self.clock.covers(chunk.peer, chunk.seq) {
            return;
        }

        self.clock.observe(chunk.peer, chunk.seq);
        self.time = self.time.max(chunk.time);

        let stamp = chunk.stamp();
        let newer = self
            .registers
            .get(&chunk.key)
            .map_or(true, |current| stamp > current.stamp);
        if newer {
            self.registers.insert(
                chunk.key.clone(),
                Register {
                    stamp,
                    value: chunk.value.clone(),
                },
            );
        }

        self.history.push(chunk);
    }

    /// Live keys inside the content subtree
    fn content_keys(&self) -> Vec<String> {
        self.registers
            .iter()
            .filter(|(key, reg)| in_content(key) && reg.value.is_some())
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl Replica for TreeDoc {
    type Chunk = Chunk;
    type Clock = Clock;

    fn clock(&self) -> Clock {
        self.clock.clone()
    }

    fn apply(&mut self, chunks: &[Chunk]) {
        for chunk in chunks {
            self.apply_one(chunk.clone());
        }
    }

    fn delta(&self, since: &Clock) -> Vec<Chunk> {
        self.history
            .iter()
            .filter(|c| !since.covers(c.peer, c.seq))
            .cloned()
            .collect()
    }

    fn content(&self) -> Option<Content> {
        let keyed: Vec<(Vec<String>, Stamp, &Leaf)> = self
            .registers
            .iter()
            .filter(|(key, _)| in_content(key))
            .filter_map(|(key, reg)| {
                reg.value
                    .as_ref()
                    .map(|leaf| (split_key(&key[CONTENT_KEY.len()..]), reg.stamp, leaf))
            })
            .collect();

        let items = keyed
            .iter()
            .map(|(segments, stamp, leaf)| (segments.as_slice(), *stamp, *leaf))
            .collect();

        let (built, _) = assemble(items)?;
        Some(match built {
            Built::Leaf(Leaf::Text(text)) => Content::Text(text.clone()),
            Built::Leaf(Leaf::Bytes(bytes)) => Content::Bytes(bytes.clone()),
            other => Content::Json(other.into_value()),
        })
    }

    fn set_content(&mut self, content: Content) {
        let mut next = BTreeMap::new();
        match content {
            Content::Text(text) => {
                next.insert(CONTENT_KEY.to_string(), Leaf::Text(text));
            }
            Content::Bytes(bytes) => {
                next.insert(CONTENT_KEY.to_string(), Leaf::Bytes(bytes));
            }
            Content::Json(value) => flatten(CONTENT_KEY.to_string(), &value, &mut next),
        }

        for key in self.content_keys() {
            if !next.contains_key(&key) {
                self.put(&key, None);
            }
        }
        for (key, leaf) in next {
            self.put(&key, Some(leaf));
        }
    }

    fn pack(chunk: &Chunk) -> Result<Vec<u8>> {
        Ok(bincode::serialize(chunk)?)
    }

    fn unpack(bytes: &[u8]) -> Result<Chunk> {
        Ok(bincode::deserialize(bytes)?)
    }
}

fn in_content(key: &str) -> bool {
    key == CONTENT_KEY
        || key
            .strip_prefix(CONTENT_KEY)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// `"/a/b"` -> `["a", "b"]`, `""` -> `[]`
fn split_key(rest: &str) -> Vec<String> {
    rest.split('/')
        .skip(1)
        .map(unescape_segment)
        .collect()
}

fn flatten(prefix: String, value: &Value, out: &mut BTreeMap<String, Leaf>) {
    let leaf = match value {
        Value::Object(fields) if !fields.is_empty() => {
            for (name, child) in fields {
                flatten(format!("{}/{}", prefix, escape_segment(name)), child, out);
            }
            return;
        }
        Value::Object(_) => Leaf::Object,
        Value::Array(_) => Leaf::Array(value.to_string()),
        Value::String(s) => Leaf::Str(s.clone()),
        Value::Number(n) => Leaf::Number(n.to_string()),
        Value::Bool(b) => Leaf::Bool(*b),
        Value::Null => Leaf::Null,
    };
    out.insert(prefix, leaf);
}

enum Built<'a> {
    Leaf(&'a Leaf),
    Object(Map<String, Value>),
}

impl Built<'_> {
    fn into_value(self) -> Value {
        match self {
            Built::Object(fields) => Value::Object(fields),
            Built::Leaf(leaf) => match leaf {
                Leaf::Null => Value::Null,
                Leaf::Bool(b) => Value::Bool(*b),
                Leaf::Number(n) => serde_json::from_str(n).unwrap_or(Value::Null),
                Leaf::Str(s) | Leaf::Text(s) => Value::String(s.clone()),
                Leaf::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
                Leaf::Object => Value::Object(Map::new()),
                Leaf::Array(json) => serde_json::from_str(json).unwrap_or(Value::Null),
            },
        }
    }
}

/// Rebuild a subtree from its live registers
///
/// A scalar and nested keys can both be live after concurrent edits; the
/// side holding the newest stamp wins. An empty-object marker never hides
/// its children.
fn assemble<'a>(items: Vec<(&'a [String], Stamp, &'a Leaf)>) -> Option<(Built<'a>, Stamp)> {
    let mut own: Option<(Stamp, &'a Leaf)> = None;
    let mut groups: BTreeMap<&'a str, Vec<(&'a [String], Stamp, &'a Leaf)>> = BTreeMap::new();

    for (segments, stamp, leaf) in items {
        match segments.split_first() {
            None => own = Some((stamp, leaf)),
            Some((head, rest)) => groups.entry(head.as_str()).or_default().push((rest, stamp, leaf)),
        }
    }

    let mut fields = Map::new();
    let mut newest: Option<Stamp> = None;
    for (name, group) in groups {
        if let Some((built, stamp)) = assemble(group) {
            fields.insert(name.to_string(), built.into_value());
            newest = newest.max(Some(stamp));
        }
    }

    match (own, newest) {
        (Some((stamp, leaf)), None) => Some((Built::Leaf(leaf), stamp)),
        (Some((stamp, leaf)), Some(child)) if stamp > child && *leaf != Leaf::Object => {
            Some((Built::Leaf(leaf), stamp))
        }
        (own, Some(child)) => {
            let stamp = own.map_or(child, |(s, _)| s.max(child));
            Some((Built::Object(fields), stamp))
        }
        (None, None) => None,
    }
}
