//! Addressable, read-only materialization of one JSON document.
//!
//! Nodes live in a flat arena and refer to each other by index, so a
//! lambda argument binding is just a [`NodeId`]. The arena is cleared, not
//! freed, between documents.

use std::ops::Range;

use crate::{
    json::{DEFAULT_MAX_DEPTH, JsonEvent, JsonReader, ReadError},
    path::PathSegment,
    pool::Reset,
    scalar::Scalar,
};

/// Index of a node in a [`Document`].
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum DocNode {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    Array(Vec<NodeId>),
    Object(Vec<(String, NodeId)>),
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<DocNode>,
    /// Source byte range of each node
    spans: Vec<Range<usize>>,
    root: Option<NodeId>,
    max_depth: usize,
    parents: Vec<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }
}

impl Reset for Document {
    fn reset(&mut self) {
        self.clear();
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Document {
            nodes: Vec::new(),
            spans: Vec::new(),
            root: None,
            max_depth,
            parents: Vec::new(),
        }
    }

    pub fn from_slice(input: &[u8]) -> Result<Self, ReadError> {
        let mut doc = Document::new();
        doc.parse(input)?;
        Ok(doc)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.spans.clear();
        self.parents.clear();
        self.root = None;
    }

    /// Replace the contents with the document in `input`.
    ///
    /// An empty input yields a document without a root.
    pub fn parse(&mut self, input: &[u8]) -> Result<(), ReadError> {
        self.clear();
        let mut reader = JsonReader::with_max_depth(input, self.max_depth);

        loop {
            let event = reader.next_event();
            let node = match event {
                JsonEvent::Eof => return Ok(()),
                JsonEvent::Error => return Err(reader.take_error()),
                JsonEvent::ObjectEnd | JsonEvent::ArrayEnd => {
                    if let Some(id) = self.parents.pop() {
                        self.spans[id].end = reader.position();
                    }
                    continue;
                }
                JsonEvent::ObjectStart => DocNode::Object(Vec::new()),
                JsonEvent::ArrayStart => DocNode::Array(Vec::new()),
                JsonEvent::ValueString => DocNode::String(reader.value().to_string()),
                JsonEvent::ValueBool => DocNode::Bool(reader.bool_value()),
                JsonEvent::ValueNull => DocNode::Null,
                JsonEvent::ValueNumber => number_node(reader.value(), reader.number_is_integer()),
            };

            let id = self.nodes.len();
            self.nodes.push(node);
            self.spans.push(reader.value_span());
            match self.parents.last().copied() {
                None => self.root = Some(id),
                Some(parent) => match &mut self.nodes[parent] {
                    DocNode::Object(members) => {
                        members.push((reader.key().unwrap_or_default().to_string(), id));
                    }
                    DocNode::Array(items) => items.push(id),
                    _ => {}
                },
            }
            if event.is_container_start() {
                self.parents.push(id);
            }
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &DocNode {
        &self.nodes[id]
    }

    /// Byte range of the node's text in the parsed input.
    pub fn span(&self, id: NodeId) -> Range<usize> {
        self.spans[id].clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Object member by name. The last occurrence wins for repeated keys.
    pub fn member(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match &self.nodes[id] {
            DocNode::Object(members) => members.iter().rev().find(|(k, _)| k == key).map(|(_, v)| *v),
            _ => None,
        }
    }

    pub fn element(&self, id: NodeId, index: usize) -> Option<NodeId> {
        match &self.nodes[id] {
            DocNode::Array(items) => items.get(index).copied(),
            _ => None,
        }
    }

    pub fn elements(&self, id: NodeId) -> Option<&[NodeId]> {
        match &self.nodes[id] {
            DocNode::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Follow one non-wildcard step.
    pub fn step(&self, id: NodeId, segment: &PathSegment) -> Option<NodeId> {
        match segment {
            PathSegment::Key(key) => self.member(id, key),
            PathSegment::Index(index) => self.element(id, *index),
            PathSegment::Wildcard => None,
        }
    }

    /// Resolve RFC 6901 reference tokens (already unescaped).
    pub fn pointer(&self, tokens: &[String]) -> Option<NodeId> {
        let mut current = self.root?;
        for token in tokens {
            current = match &self.nodes[current] {
                DocNode::Object(_) => self.member(current, token)?,
                DocNode::Array(_) => self.element(current, token.parse().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Scalar view of a node; containers become placeholders.
    pub fn scalar(&self, id: NodeId) -> Scalar {
        match &self.nodes[id] {
            DocNode::Null => Scalar::Null,
            DocNode::Bool(b) => Scalar::Bool(*b),
            DocNode::Long(n) => Scalar::Long(*n),
            DocNode::Double(n) => Scalar::Double(*n),
            DocNode::String(s) => Scalar::String(s.clone()),
            DocNode::Array(_) => Scalar::Array,
            DocNode::Object(_) => Scalar::Object,
        }
    }

    /// Structural equality with `value`; numbers compare by value, so
    /// `1` equals `1.0`. Repeated keys count once, last occurrence.
    pub fn json_equals(&self, id: NodeId, value: &serde_json::Value) -> bool {
        match (&self.nodes[id], value) {
            (DocNode::Array(items), serde_json::Value::Array(expected)) => {
                items.len() == expected.len()
                    && items.iter().zip(expected).all(|(i, v)| self.json_equals(*i, v))
            }
            (DocNode::Object(members), serde_json::Value::Object(expected)) => {
                let distinct = members
                    .iter()
                    .filter(|(k, v)| self.member(id, k) == Some(*v))
                    .count();
                distinct == expected.len()
                    && expected.iter().all(|(k, v)| {
                        self.member(id, k).is_some_and(|m| self.json_equals(m, v))
                    })
            }
            (DocNode::Array(_) | DocNode::Object(_), _) => false,
            (_, serde_json::Value::Array(_) | serde_json::Value::Object(_)) => false,
            _ => self.scalar(id).equals_to(&Scalar::from_json(value)) == Scalar::TRUE,
        }
    }

    pub fn to_json(&self, id: NodeId) -> serde_json::Value {
        match &self.nodes[id] {
            DocNode::Array(items) => {
                serde_json::Value::Array(items.iter().map(|i| self.to_json(*i)).collect())
            }
            DocNode::Object(members) => serde_json::Value::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), self.to_json(*v)))
                    .collect(),
            ),
            _ => self.scalar(id).to_json(),
        }
    }
}

fn number_node(text: &str, is_integer: bool) -> DocNode {
    if is_integer && let Ok(n) = text.parse::<i64>() {
        return DocNode::Long(n);
    }
    DocNode::Double(text.parse::<f64>().unwrap_or(f64::NAN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_lookup() {
        let doc = Document::from_slice(br#"{"name":"Foo","tags":["a","b"],"n":1.5}"#).unwrap();
        let root = doc.root().unwrap();
        let name = doc.member(root, "name").unwrap();
        assert_eq!(doc.scalar(name), Scalar::String("Foo".into()));
        let tags = doc.member(root, "tags").unwrap();
        assert_eq!(doc.elements(tags).unwrap().len(), 2);
        assert_eq!(doc.scalar(doc.member(root, "n").unwrap()), Scalar::Double(1.5));
        assert_eq!(doc.member(root, "missing"), None);
    }

    #[test]
    fn test_pointer() {
        let doc = Document::from_slice(br#"{"a":[{"b":7}]}"#).unwrap();
        let id = doc.pointer(&["a".into(), "0".into(), "b".into()]).unwrap();
        assert_eq!(doc.scalar(id), Scalar::Long(7));
        assert_eq!(doc.pointer(&["a".into(), "x".into()]), None);
    }

    #[test]
    fn test_reparse_clears() {
        let mut doc = Document::new();
        doc.parse(br#"{"a":1}"#).unwrap();
        doc.parse(b"[]").unwrap();
        assert_eq!(doc.len(), 1);
        doc.parse(b"").unwrap();
        assert_eq!(doc.root(), None);
    }

    #[test]
    fn test_to_json() {
        let doc = Document::from_slice(br#"{"a":[1,2.5,null],"b":{"c":"x"}}"#).unwrap();
        assert_eq!(
            doc.to_json(doc.root().unwrap()),
            serde_json::json!({"a": [1, 2.5, null], "b": {"c": "x"}})
        );
    }

    #[test]
    fn test_spans_cover_source_text() {
        let input = br#"{"a": [1, {"b":null}], "n":18446744073709551615}"#;
        let doc = Document::from_slice(input).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(doc.span(root), 0..input.len());
        let a = doc.member(root, "a").unwrap();
        assert_eq!(&input[doc.span(a)], br#"[1, {"b":null}]"#);
        let n = doc.member(root, "n").unwrap();
        assert_eq!(&input[doc.span(n)], b"18446744073709551615");
    }

    #[test]
    fn test_json_equals() {
        let doc = Document::from_slice(br#"{"a":1.0,"b":[1,"x"],"c":{"d":null},"a":2}"#).unwrap();
        let root = doc.root().unwrap();
        assert!(doc.json_equals(root, &serde_json::json!({"a": 2, "b": [1.0, "x"], "c": {"d": null}})));
        assert!(!doc.json_equals(root, &serde_json::json!({"a": 2, "b": [1, "x"]})));
        let b = doc.member(root, "b").unwrap();
        assert!(!doc.json_equals(b, &serde_json::json!([1])));
        assert!(!doc.json_equals(b, &serde_json::json!("x")));
    }

    #[test]
    fn test_big_integer_becomes_double() {
        let doc = Document::from_slice(b"123456789012345678901234").unwrap();
        assert!(matches!(doc.node(0), DocNode::Double(_)));
    }
}
