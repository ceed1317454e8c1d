//! Single-pass extraction of many paths from one document.
//!
//! The paths are merged into a prefix tree once. Selecting then walks the
//! token stream and the tree in lock-step: a member whose key has no tree
//! node is skipped without being entered, so the work per document is
//! linear in its size no matter how many paths are requested.

use std::collections::HashMap;

use crate::{
    config::EngineConfig,
    json::{DEFAULT_MAX_DEPTH, JsonEvent, JsonReader, ReadError},
    path::{PathError, PathSegment, parse_path},
    pool::Reset,
    scalar::Scalar,
};

/// Node of a [`PathTree`].
#[derive(Debug)]
pub struct PathNode<T> {
    keys: HashMap<String, usize>,
    indices: HashMap<usize, usize>,
    wildcard: Option<usize>,
    /// Collectors attached where a requested path ends
    pub selectors: Vec<T>,
    /// Element position of the last visit through the wildcard child
    pub array_index: usize,
}

impl<T> PathNode<T> {
    fn new() -> Self {
        PathNode {
            keys: HashMap::new(),
            indices: HashMap::new(),
            wildcard: None,
            selectors: Vec::new(),
            array_index: 0,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.keys.is_empty() || !self.indices.is_empty() || self.wildcard.is_some()
    }
}

/// Arena prefix tree over path segments. Node `0` is the root.
#[derive(Debug)]
pub struct PathTree<T> {
    nodes: Vec<PathNode<T>>,
}

impl<T> Default for PathTree<T> {
    fn default() -> Self {
        PathTree {
            nodes: vec![PathNode::new()],
        }
    }
}

impl<T> PathTree<T> {
    pub const ROOT: usize = 0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[Self::ROOT] = PathNode::new();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.nodes[Self::ROOT].has_children()
    }

    pub fn node(&self, id: usize) -> &PathNode<T> {
        &self.nodes[id]
    }

    /// Add `path`, attaching `selector` to its terminal node.
    pub fn insert(&mut self, path: &[PathSegment], selector: T) -> usize {
        let mut current = Self::ROOT;
        for segment in path {
            let existing = match segment {
                PathSegment::Key(key) => self.nodes[current].keys.get(key).copied(),
                PathSegment::Index(i) => self.nodes[current].indices.get(i).copied(),
                PathSegment::Wildcard => self.nodes[current].wildcard,
            };
            current = match existing {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(PathNode::new());
                    let node = &mut self.nodes[current];
                    match segment {
                        PathSegment::Key(key) => {
                            node.keys.insert(key.clone(), child);
                        }
                        PathSegment::Index(i) => {
                            node.indices.insert(*i, child);
                        }
                        PathSegment::Wildcard => node.wildcard = Some(child),
                    }
                    child
                }
            };
        }
        self.nodes[current].selectors.push(selector);
        current
    }

    pub fn child_for_key(&self, id: usize, key: &str) -> Option<usize> {
        self.nodes[id].keys.get(key).copied()
    }

    /// Child matching array element `index`. A wildcard child takes
    /// precedence over a literal index on the same node.
    pub fn child_for_index(&mut self, id: usize, index: usize) -> Option<usize> {
        if let Some(child) = self.nodes[id].wildcard {
            self.nodes[child].array_index = index;
            return Some(child);
        }
        self.nodes[id].indices.get(&index).copied()
    }
}

/// Matches of one requested path in one document, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectResult {
    pub values: Vec<Scalar>,
    /// Source text of each match, parallel to `values`. Objects and arrays
    /// appear here in full even though their scalar is a placeholder.
    pub json: Vec<String>,
}

impl SelectResult {
    /// The only match, or `None` when the path matched zero or several times.
    pub fn single(&self) -> Option<&Scalar> {
        match self.values.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Frame {
    node: usize,
    is_object: bool,
    next_index: usize,
    start: usize,
    /// `(result, slot)` pairs waiting for this container's source text
    pending: Vec<(usize, usize)>,
}

#[derive(Debug, Default)]
pub struct Selector {
    paths: Vec<String>,
    tree: PathTree<usize>,
    results: Vec<SelectResult>,
    stack: Vec<Frame>,
    error: Option<ReadError>,
    max_depth: usize,
    skipped: usize,
    events_read: usize,
}

impl Reset for Selector {
    fn reset(&mut self) {
        self.paths.clear();
        self.tree.clear();
        self.results.clear();
        self.stack.clear();
        self.error = None;
        self.skipped = 0;
        self.events_read = 0;
    }
}

impl Selector {
    pub fn new<S: AsRef<str>>(paths: &[S]) -> Result<Self, PathError> {
        Self::with_config(paths, &EngineConfig::default())
    }

    pub fn with_config<S: AsRef<str>>(
        paths: &[S],
        config: &EngineConfig,
    ) -> Result<Self, PathError> {
        let mut selector = Selector {
            max_depth: config.max_depth,
            ..Selector::default()
        };
        selector.set_paths(paths)?;
        Ok(selector)
    }

    /// Replace the requested paths and rebuild the tree.
    pub fn set_paths<S: AsRef<str>>(&mut self, paths: &[S]) -> Result<(), PathError> {
        self.reset();
        for (i, text) in paths.iter().enumerate() {
            let path = parse_path(text.as_ref())?;
            self.tree.insert(&path, i);
            self.paths.push(text.as_ref().to_string());
        }
        self.results = vec![SelectResult::default(); paths.len()];
        tracing::debug!(paths = paths.len(), nodes = self.tree.len(), "built path tree");
        Ok(())
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Results of the last [`select`](Selector::select), parallel to the paths.
    pub fn results(&self) -> &[SelectResult] {
        &self.results
    }

    /// Tokenizer diagnostic of the last failed selection.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ReadError::to_string)
    }

    /// Subtrees passed over without being entered in the last selection.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Tokens consumed by the last selection.
    pub fn events_read(&self) -> usize {
        self.events_read
    }

    /// Extract every requested path from `json` in one pass.
    ///
    /// An empty document yields no matches, as does a scalar root.
    pub fn select(&mut self, json: &[u8]) -> Result<&[SelectResult], ReadError> {
        for result in &mut self.results {
            result.values.clear();
            result.json.clear();
        }
        self.stack.clear();
        self.error = None;

        let max_depth = if self.max_depth == 0 {
            DEFAULT_MAX_DEPTH
        } else {
            self.max_depth
        };
        let mut reader = JsonReader::with_max_depth(json, max_depth);
        let outcome = self.walk(&mut reader);
        self.skipped = reader.skipped();
        self.events_read = reader.events_read();
        match outcome {
            Ok(()) => Ok(&self.results),
            Err(err) => {
                for result in &mut self.results {
                    result.values.clear();
                    result.json.clear();
                }
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn walk(&mut self, reader: &mut JsonReader<'_>) -> Result<(), ReadError> {
        match reader.next_event() {
            JsonEvent::Eof => return Ok(()),
            JsonEvent::Error => return Err(reader.take_error()),
            JsonEvent::ObjectStart | JsonEvent::ArrayStart if self.tree.is_empty() => {
                reader.skip_tree()?;
            }
            event @ (JsonEvent::ObjectStart | JsonEvent::ArrayStart) => {
                self.stack.push(Frame {
                    node: PathTree::<usize>::ROOT,
                    is_object: event == JsonEvent::ObjectStart,
                    next_index: 0,
                    start: reader.value_span().start,
                    pending: Vec::new(),
                });
            }
            _ => {}
        }

        while !self.stack.is_empty() {
            let event = reader.next_event();
            match event {
                JsonEvent::Error | JsonEvent::Eof => return Err(reader.take_error()),
                JsonEvent::ObjectEnd | JsonEvent::ArrayEnd => {
                    if let Some(frame) = self.stack.pop()
                        && !frame.pending.is_empty()
                    {
                        let text = source_text(reader.input(), frame.start..reader.position());
                        for (result, slot) in frame.pending {
                            self.results[result].json[slot] = text.clone();
                        }
                    }
                }
                _ => self.visit(reader, event)?,
            }
        }

        match reader.next_event() {
            JsonEvent::Error => Err(reader.take_error()),
            _ => Ok(()),
        }
    }

    fn visit(&mut self, reader: &mut JsonReader<'_>, event: JsonEvent) -> Result<(), ReadError> {
        let Some(parent) = self.stack.last_mut() else {
            return Ok(());
        };
        let node = parent.node;
        let matched = if parent.is_object {
            self.tree.child_for_key(node, reader.key().unwrap_or_default())
        } else {
            let index = parent.next_index;
            parent.next_index += 1;
            self.tree.child_for_index(node, index)
        };

        let Some(child) = matched else {
            if event.is_container_start() {
                reader.skip_tree()?;
            }
            return Ok(());
        };

        let is_container = event.is_container_start();
        let start = reader.value_span().start;
        let value = scalar_of(reader, event);
        let raw = if is_container {
            String::new()
        } else {
            source_text(reader.input(), reader.value_span())
        };
        let mut pending = Vec::new();
        for &result in &self.tree.node(child).selectors {
            let result_set = &mut self.results[result];
            result_set.values.push(value.clone());
            result_set.json.push(raw.clone());
            if is_container {
                pending.push((result, result_set.json.len() - 1));
            }
        }

        if !is_container {
            return Ok(());
        }
        if self.tree.node(child).has_children() {
            self.stack.push(Frame {
                node: child,
                is_object: event == JsonEvent::ObjectStart,
                next_index: 0,
                start,
                pending,
            });
        } else {
            let span = reader.skip_tree()?;
            let text = source_text(reader.input(), span);
            for (result, slot) in pending {
                self.results[result].json[slot] = text.clone();
            }
        }
        Ok(())
    }
}

fn scalar_of(reader: &JsonReader<'_>, event: JsonEvent) -> Scalar {
    match event {
        JsonEvent::ValueString => Scalar::String(reader.value().to_string()),
        JsonEvent::ValueNumber => {
            let text = reader.value();
            if reader.number_is_integer()
                && let Ok(n) = text.parse::<i64>()
            {
                return Scalar::Long(n);
            }
            Scalar::Double(text.parse().unwrap_or(f64::NAN))
        }
        JsonEvent::ValueBool => Scalar::Bool(reader.bool_value()),
        JsonEvent::ValueNull => Scalar::Null,
        JsonEvent::ObjectStart => Scalar::Object,
        JsonEvent::ArrayStart => Scalar::Array,
        _ => Scalar::Undefined,
    }
}

fn source_text(input: &[u8], span: std::ops::Range<usize>) -> String {
    String::from_utf8_lossy(&input[span]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_shares_prefixes() {
        let mut tree = PathTree::new();
        tree.insert(&parse_path("a.b").unwrap(), 0);
        tree.insert(&parse_path("a.c").unwrap(), 1);
        tree.insert(&parse_path("a.b").unwrap(), 2);
        assert_eq!(tree.len(), 4);
        let a = tree.child_for_key(PathTree::<usize>::ROOT, "a").unwrap();
        let b = tree.child_for_key(a, "b").unwrap();
        assert_eq!(tree.node(b).selectors, vec![0, 2]);
    }

    #[test]
    fn test_wildcard_records_index() {
        let mut tree = PathTree::new();
        tree.insert(&parse_path("a[*]").unwrap(), 0);
        tree.insert(&parse_path("a[1]").unwrap(), 1);
        let a = tree.child_for_key(PathTree::<usize>::ROOT, "a").unwrap();
        let w = tree.child_for_index(a, 3).unwrap();
        assert_eq!(tree.node(w).array_index, 3);
        assert_eq!(tree.child_for_index(a, 1), Some(w));
    }

    #[test]
    fn test_clear() {
        let mut tree = PathTree::new();
        tree.insert(&parse_path("a.b").unwrap(), 0);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
    }
}
