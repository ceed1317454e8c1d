//! Streaming application of JSON Patch (RFC 6902 shaped) operations.
//!
//! The operations are grouped into a tree keyed by pointer segment. One
//! pass over the target then copies every untouched value byte for byte
//! and splices replacements, insertions and removals where the tree has a
//! target.

use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    ast::WireError,
    config::EngineConfig,
    document::Document,
    json::{JsonEvent, JsonReader, JsonWriter, ReadError},
    pool::Reset,
};

/// One patch operation as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOperation {
    Replace { path: String, value: serde_json::Value },
    Add { path: String, value: serde_json::Value },
    Remove { path: String },
    Copy { from: String, path: String },
    Move { from: String, path: String },
    Test { path: String, value: serde_json::Value },
}

impl PatchOperation {
    pub fn path(&self) -> &str {
        match self {
            PatchOperation::Replace { path, .. }
            | PatchOperation::Add { path, .. }
            | PatchOperation::Remove { path }
            | PatchOperation::Copy { path, .. }
            | PatchOperation::Move { path, .. }
            | PatchOperation::Test { path, .. } => path,
        }
    }
}

/// Decode a patch document (a JSON array of operations).
pub fn parse_patch(json: &str) -> Result<Vec<PatchOperation>, WireError> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Debug)]
pub enum PatchError {
    /// The target document is malformed
    Read(ReadError),
    Wire(WireError),
    /// A path is not a JSON pointer
    InvalidPath { path: String },
    /// The streaming walk cannot express this operation
    Unsupported { path: String, op: &'static str },
    TestFailed { path: String },
    PathNotFound { path: String },
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::Read(e) => write!(f, "{}", e),
            PatchError::Wire(e) => write!(f, "{}", e),
            PatchError::InvalidPath { path } => write!(f, "invalid JSON pointer '{}'", path),
            PatchError::Unsupported { path, op } => {
                write!(f, "'{}' at '{}' is not supported", op, path)
            }
            PatchError::TestFailed { path } => write!(f, "test failed at '{}'", path),
            PatchError::PathNotFound { path } => write!(f, "path '{}' not found", path),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::Read(e) => Some(e),
            PatchError::Wire(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReadError> for PatchError {
    fn from(e: ReadError) -> Self {
        PatchError::Read(e)
    }
}

impl From<WireError> for PatchError {
    fn from(e: WireError) -> Self {
        PatchError::Wire(e)
    }
}

/// Split a JSON pointer into unescaped reference tokens.
pub fn parse_pointer(path: &str) -> Result<Vec<String>, PatchError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(PatchError::InvalidPath { path: path.to_string() });
    };
    rest.split('/')
        .map(|token| {
            if token.contains('~') && !valid_escapes(token) {
                return Err(PatchError::InvalidPath { path: path.to_string() });
            }
            Ok(token.replace("~1", "/").replace("~0", "~"))
        })
        .collect()
}

fn valid_escapes(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'~')
        .all(|(i, _)| matches!(bytes.get(i + 1), Some(b'0' | b'1')))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
    Replace,
    Add,
    Remove,
}

impl PatchType {
    pub fn name(self) -> &'static str {
        match self {
            PatchType::Replace => "replace",
            PatchType::Add => "add",
            PatchType::Remove => "remove",
        }
    }
}

/// Node of a [`PatchTree`]. Only terminal targets carry a patch; ancestors
/// carry children only.
#[derive(Debug, Default)]
pub struct PatchNode {
    children: Vec<(String, usize)>,
    pub patch: Option<PatchType>,
    pub payload: Vec<u8>,
    /// Pointer text of the operation targeting this node
    pub path: String,
}

/// Arena tree over pointer segments. Node `0` is the document root.
#[derive(Debug)]
pub struct PatchTree {
    nodes: Vec<PatchNode>,
}

impl Default for PatchTree {
    fn default() -> Self {
        PatchTree {
            nodes: vec![PatchNode::default()],
        }
    }
}

impl PatchTree {
    pub const ROOT: usize = 0;

    /// Drop every node but the root, keeping allocations.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        let root = &mut self.nodes[Self::ROOT];
        root.children.clear();
        root.patch = None;
        root.payload.clear();
        root.path.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[Self::ROOT].children.is_empty()
    }

    pub fn node(&self, id: usize) -> &PatchNode {
        &self.nodes[id]
    }

    /// Record `patch` at `tokens`. A later operation on the same path
    /// replaces an earlier one; operations nested inside another target
    /// are rejected.
    pub fn insert(
        &mut self,
        tokens: &[String],
        path: &str,
        patch: PatchType,
        payload: Vec<u8>,
    ) -> Result<usize, PatchError> {
        let overlapping = || PatchError::Unsupported {
            path: path.to_string(),
            op: patch.name(),
        };
        let mut current = Self::ROOT;
        for token in tokens {
            if self.nodes[current].patch.is_some() {
                return Err(overlapping());
            }
            let existing = self.nodes[current]
                .children
                .iter()
                .find(|(key, _)| key == token)
                .map(|(_, id)| *id);
            current = match existing {
                Some(id) => id,
                None => {
                    let id = self.nodes.len();
                    self.nodes.push(PatchNode::default());
                    self.nodes[current].children.push((token.clone(), id));
                    id
                }
            };
        }
        let node = &mut self.nodes[current];
        if !node.children.is_empty() {
            return Err(overlapping());
        }
        node.patch = Some(patch);
        node.payload = payload;
        node.path = path.to_string();
        Ok(current)
    }

    /// Detach the child for `key` so a repeated key falls through.
    fn take_child(&mut self, id: usize, key: &str) -> Option<usize> {
        let children = &mut self.nodes[id].children;
        let pos = children.iter().position(|(k, _)| k == key)?;
        Some(children.remove(pos).1)
    }

    /// Pointer of the first target at or below `id`.
    fn first_target(&self, id: usize) -> String {
        let mut current = id;
        loop {
            let node = &self.nodes[current];
            match node.children.first() {
                Some((_, child)) if node.patch.is_none() => current = *child,
                _ => return node.path.clone(),
            }
        }
    }
}

/// Operation reduced to what the walk handles.
struct Target {
    patch: PatchType,
    path: String,
    tokens: Vec<String>,
    payload: Vec<u8>,
}

impl Target {
    fn new(patch: PatchType, path: &str, payload: Vec<u8>) -> Result<Self, PatchError> {
        Ok(Target {
            patch,
            path: path.to_string(),
            tokens: parse_pointer(path)?,
            payload,
        })
    }

    /// One pointer is a prefix of the other.
    fn overlaps(&self, tokens: &[String]) -> bool {
        tokens.starts_with(&self.tokens) || self.tokens.starts_with(tokens)
    }
}

/// A value as seen after the targets resolved so far.
enum Current {
    Missing,
    Raw(Vec<u8>),
    /// Something below it is being changed
    Modified,
}

#[derive(Debug)]
struct Frame {
    node: usize,
    is_object: bool,
    next_index: usize,
}

/// Applies patches; holds the tree, writer and stack between calls.
#[derive(Debug)]
pub struct Patcher {
    tree: PatchTree,
    writer: JsonWriter,
    stack: Vec<Frame>,
    doc: Document,
    doc_loaded: bool,
    max_depth: usize,
}

impl Default for Patcher {
    fn default() -> Self {
        Self::with_config(&EngineConfig::default())
    }
}

impl Reset for Patcher {
    fn reset(&mut self) {
        self.tree.clear();
        self.writer.clear();
        self.stack.clear();
        self.doc.clear();
        self.doc_loaded = false;
    }
}

impl Patcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Patcher {
            tree: PatchTree::default(),
            writer: JsonWriter::new(),
            stack: Vec::new(),
            doc: Document::with_max_depth(config.max_depth),
            doc_loaded: false,
            max_depth: config.max_depth,
        }
    }

    /// Apply wire-format patch JSON to `json`.
    pub fn apply_wire(&mut self, json: &[u8], patch: &str) -> Result<Vec<u8>, PatchError> {
        let ops = parse_patch(patch)?;
        self.apply(json, &ops)
    }

    /// Apply `ops` to `json` and return the patched document.
    pub fn apply(&mut self, json: &[u8], ops: &[PatchOperation]) -> Result<Vec<u8>, PatchError> {
        self.reset();
        let targets = self.resolve(json, ops)?;

        let mut source: Cow<'_, [u8]> = Cow::Borrowed(json);
        for target in targets {
            if target.tokens.is_empty() {
                match target.patch {
                    PatchType::Replace | PatchType::Add => {
                        // earlier operations are overwritten along with the document
                        self.tree.clear();
                        source = Cow::Owned(target.payload);
                        continue;
                    }
                    PatchType::Remove => {
                        return Err(PatchError::Unsupported {
                            path: target.path,
                            op: target.patch.name(),
                        });
                    }
                }
            }
            self.tree
                .insert(&target.tokens, &target.path, target.patch, target.payload)?;
        }
        tracing::debug!(ops = ops.len(), nodes = self.tree.len(), "built patch tree");

        if self.tree.is_empty() {
            return Ok(source.into_owned());
        }
        self.walk(&source)?;
        Ok(self.writer.to_vec())
    }

    /// Turn `copy`/`move`/`test` into plain targets. Each reads the
    /// document as patched by the operations before it; `test` aborts the
    /// whole patch on mismatch.
    fn resolve(&mut self, json: &[u8], ops: &[PatchOperation]) -> Result<Vec<Target>, PatchError> {
        let mut targets = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                PatchOperation::Replace { path, value } => {
                    targets.push(Target::new(PatchType::Replace, path, encode(value)?)?)
                }
                PatchOperation::Add { path, value } => {
                    targets.push(Target::new(PatchType::Add, path, encode(value)?)?)
                }
                PatchOperation::Remove { path } => self.remove(json, &mut targets, path)?,
                PatchOperation::Test { path, value } => {
                    let found = self.value_at(json, &targets, path, "test")?;
                    let mut doc = Document::with_max_depth(self.max_depth);
                    doc.parse(&found)?;
                    if !doc.root().is_some_and(|root| doc.json_equals(root, value)) {
                        return Err(PatchError::TestFailed { path: path.clone() });
                    }
                }
                PatchOperation::Copy { from, path } => {
                    let value = self.value_at(json, &targets, from, "copy")?;
                    targets.push(Target::new(PatchType::Add, path, value)?);
                }
                PatchOperation::Move { from, path } => {
                    if path.starts_with(from.as_str()) && path[from.len()..].starts_with('/') {
                        return Err(PatchError::Unsupported {
                            path: path.clone(),
                            op: "move",
                        });
                    }
                    let value = self.value_at(json, &targets, from, "move")?;
                    self.remove(json, &mut targets, from)?;
                    targets.push(Target::new(PatchType::Add, path, value)?);
                }
            }
        }
        Ok(targets)
    }

    /// Record a removal. Removing what an earlier `add`/`replace` put in
    /// place drops that operation; if the member did not exist before it,
    /// nothing is left to remove.
    fn remove(&mut self, json: &[u8], targets: &mut Vec<Target>, path: &str) -> Result<(), PatchError> {
        let target = Target::new(PatchType::Remove, path, Vec::new())?;
        let latest = targets.iter().rposition(|t| t.overlaps(&target.tokens));
        if let Some(pos) = latest
            && targets[pos].tokens == target.tokens
            && targets[pos].patch != PatchType::Remove
        {
            targets.remove(pos);
            if let Current::Missing = self.current(json, targets, &target.tokens)? {
                return Ok(());
            }
        }
        targets.push(target);
        Ok(())
    }

    /// Source text of the value at `path`, for `op`.
    fn value_at(
        &mut self,
        json: &[u8],
        targets: &[Target],
        path: &str,
        op: &'static str,
    ) -> Result<Vec<u8>, PatchError> {
        let tokens = parse_pointer(path)?;
        match self.current(json, targets, &tokens)? {
            Current::Raw(raw) => Ok(raw),
            Current::Missing => Err(PatchError::PathNotFound { path: path.to_string() }),
            Current::Modified => Err(PatchError::Unsupported {
                path: path.to_string(),
                op,
            }),
        }
    }

    fn current(
        &mut self,
        json: &[u8],
        targets: &[Target],
        tokens: &[String],
    ) -> Result<Current, PatchError> {
        for earlier in targets.iter().rev() {
            if let Some(rest) = tokens.strip_prefix(earlier.tokens.as_slice()) {
                return match earlier.patch {
                    PatchType::Remove => Ok(Current::Missing),
                    PatchType::Replace | PatchType::Add => {
                        raw_at(&earlier.payload, rest, self.max_depth)
                    }
                };
            }
            if earlier.tokens.starts_with(tokens) {
                return Ok(Current::Modified);
            }
        }

        if !self.doc_loaded {
            self.doc.parse(json)?;
            self.doc_loaded = true;
        }
        Ok(match self.doc.pointer(tokens) {
            Some(id) => Current::Raw(json[self.doc.span(id)].to_vec()),
            None => Current::Missing,
        })
    }

    fn walk(&mut self, source: &[u8]) -> Result<(), PatchError> {
        let mut reader = JsonReader::with_max_depth(source, self.max_depth);
        match reader.next_event() {
            JsonEvent::Error => return Err(reader.take_error().into()),
            JsonEvent::Eof => {
                return Err(ReadError {
                    message: "empty document".into(),
                    position: 0,
                }
                .into());
            }
            JsonEvent::ObjectStart => {
                self.writer.object_start(None);
                self.stack.push(Frame {
                    node: PatchTree::ROOT,
                    is_object: true,
                    next_index: 0,
                });
            }
            JsonEvent::ArrayStart => {
                self.writer.array_start(None);
                self.stack.push(Frame {
                    node: PatchTree::ROOT,
                    is_object: false,
                    next_index: 0,
                });
            }
            _ => {
                return Err(PatchError::PathNotFound {
                    path: self.tree.first_target(PatchTree::ROOT),
                });
            }
        }

        while let Some(frame) = self.stack.last_mut() {
            let event = reader.next_event();
            match event {
                JsonEvent::Error | JsonEvent::Eof => return Err(reader.take_error().into()),
                JsonEvent::ObjectEnd => {
                    let node = frame.node;
                    self.stack.pop();
                    self.finish_object(node)?;
                }
                JsonEvent::ArrayEnd => {
                    let node = frame.node;
                    self.stack.pop();
                    self.finish_array(node)?;
                }
                _ => {
                    let (node, is_object) = (frame.node, frame.is_object);
                    let key = if is_object {
                        reader.key().unwrap_or_default().to_string()
                    } else {
                        frame.next_index += 1;
                        (frame.next_index - 1).to_string()
                    };
                    self.visit(&mut reader, event, node, is_object, key)?;
                }
            }
        }

        match reader.next_event() {
            JsonEvent::Error => Err(reader.take_error().into()),
            _ => Ok(()),
        }
    }

    fn visit(
        &mut self,
        reader: &mut JsonReader<'_>,
        event: JsonEvent,
        parent: usize,
        in_object: bool,
        key: String,
    ) -> Result<(), PatchError> {
        let member = in_object.then_some(key.as_str());
        let Some(child) = self.tree.take_child(parent, &key) else {
            let span = if event.is_container_start() {
                reader.skip_tree()?
            } else {
                reader.value_span()
            };
            self.writer.write_raw(member, &reader.input()[span]);
            return Ok(());
        };

        let node = &self.tree.nodes[child];
        match node.patch {
            Some(patch @ (PatchType::Add | PatchType::Remove)) if !in_object => {
                Err(PatchError::Unsupported {
                    path: node.path.clone(),
                    op: patch.name(),
                })
            }
            Some(PatchType::Replace | PatchType::Add) => {
                if event.is_container_start() {
                    reader.skip_tree()?;
                }
                self.writer.write_raw(member, &self.tree.nodes[child].payload);
                Ok(())
            }
            Some(PatchType::Remove) => {
                if event.is_container_start() {
                    reader.skip_tree()?;
                }
                Ok(())
            }
            None => {
                let is_object = match event {
                    JsonEvent::ObjectStart => true,
                    JsonEvent::ArrayStart => false,
                    _ => {
                        return Err(PatchError::PathNotFound {
                            path: self.tree.first_target(child),
                        });
                    }
                };
                if is_object {
                    self.writer.object_start(member);
                } else {
                    self.writer.array_start(member);
                }
                self.stack.push(Frame {
                    node: child,
                    is_object,
                    next_index: 0,
                });
                Ok(())
            }
        }
    }

    /// Append members targeted by `add`/`replace` that the source lacked.
    fn finish_object(&mut self, id: usize) -> Result<(), PatchError> {
        for (key, child) in &self.tree.nodes[id].children {
            let node = &self.tree.nodes[*child];
            match node.patch {
                Some(PatchType::Replace | PatchType::Add) => {
                    self.writer.write_raw(Some(key.as_str()), &node.payload);
                }
                _ => {
                    return Err(PatchError::PathNotFound {
                        path: self.tree.first_target(*child),
                    });
                }
            }
        }
        self.writer.object_end();
        Ok(())
    }

    fn finish_array(&mut self, id: usize) -> Result<(), PatchError> {
        if let Some((_, child)) = self.tree.nodes[id].children.first() {
            let node = &self.tree.nodes[*child];
            return Err(match node.patch {
                Some(patch @ (PatchType::Add | PatchType::Remove)) => PatchError::Unsupported {
                    path: node.path.clone(),
                    op: patch.name(),
                },
                _ => PatchError::PathNotFound {
                    path: self.tree.first_target(*child),
                },
            });
        }
        self.writer.array_end();
        Ok(())
    }
}

fn encode(value: &serde_json::Value) -> Result<Vec<u8>, PatchError> {
    serde_json::to_vec(value).map_err(|e| PatchError::Wire(e.into()))
}

/// Source text at `tokens` inside an operation's payload.
fn raw_at(payload: &[u8], tokens: &[String], max_depth: usize) -> Result<Current, PatchError> {
    if tokens.is_empty() {
        return Ok(Current::Raw(payload.to_vec()));
    }
    let mut doc = Document::with_max_depth(max_depth);
    doc.parse(payload)?;
    Ok(match doc.pointer(tokens) {
        Some(id) => Current::Raw(payload[doc.span(id)].to_vec()),
        None => Current::Missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pointer() {
        assert_eq!(parse_pointer("").unwrap(), Vec::<String>::new());
        assert_eq!(parse_pointer("/a~1b/c~0d/0").unwrap(), vec!["a/b", "c~d", "0"]);
        assert!(parse_pointer("a/b").is_err());
        assert!(parse_pointer("/a~2").is_err());
    }

    #[test]
    fn test_tree_rejects_nested_targets() {
        let mut tree = PatchTree::default();
        tree.insert(&["a".into()], "/a", PatchType::Replace, b"1".to_vec())
            .unwrap();
        assert!(matches!(
            tree.insert(&["a".into(), "b".into()], "/a/b", PatchType::Add, b"2".to_vec()),
            Err(PatchError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_clear_keeps_root() {
        let mut tree = PatchTree::default();
        tree.insert(&["a".into(), "b".into()], "/a/b", PatchType::Remove, Vec::new())
            .unwrap();
        assert_eq!(tree.len(), 3);
        tree.clear();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_nested_replace_copies_siblings() {
        let mut patcher = Patcher::new();
        let out = patcher
            .apply(
                br#"{"a":{"x":1,"y":[1, 2]},"b":"k"}"#,
                &[PatchOperation::Replace {
                    path: "/a/x".into(),
                    value: serde_json::json!(5),
                }],
            )
            .unwrap();
        assert_eq!(out, br#"{"a":{"x":5,"y":[1, 2]},"b":"k"}"#.to_vec());
    }
}
