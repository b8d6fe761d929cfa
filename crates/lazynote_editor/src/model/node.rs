//! Document node domain model.
//!
//! # Responsibility
//! - Define the typed, attributed tree shared by every editor subsystem.
//! - Provide read-only navigation helpers (path lookup, text content, walks).
//!
//! # Invariants
//! - A node is either a text leaf (`NodeContent::Text`) or a container
//!   (`NodeContent::Children`), never both.
//! - Marks are only meaningful on text leaves and never repeat a type name.
//! - Nodes carry no behavior; schema rules live in `extension::schema`.

use crate::model::path::Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Attribute key holding the stable block identifier.
pub const BLOCK_ID_ATTR: &str = "blockId";

/// Ordered attribute map. Ordering keeps equality and serialization stable.
pub type Attrs = BTreeMap<String, AttrValue>;

/// Scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Named annotation applied to a text leaf (bold, link, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attrs(type_name: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            type_name: type_name.into(),
            attrs,
        }
    }
}

/// Leaf text or ordered child list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeContent {
    Text(String),
    Children(Vec<Node>),
}

/// One typed element of the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,
    pub content: NodeContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    /// Creates a container node without schema normalization.
    ///
    /// Missing attributes are filled when the node passes through
    /// `Schema::normalize` (every insert step does this).
    pub fn element(type_name: impl Into<String>, attrs: Attrs, children: Vec<Node>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs,
            content: NodeContent::Children(children),
            marks: Vec::new(),
        }
    }

    /// Creates a plain text leaf of type `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            type_name: "text".to_string(),
            attrs: Attrs::new(),
            content: NodeContent::Text(text.into()),
            marks: Vec::new(),
        }
    }

    /// Creates a text leaf carrying `marks` (duplicates are dropped).
    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        let mut node = Self::text(text);
        for mark in marks {
            node.add_mark(mark);
        }
        node
    }

    pub fn is_text(&self) -> bool {
        matches!(self.content, NodeContent::Text(_))
    }

    pub fn text_value(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Text(text) => Some(text.as_str()),
            NodeContent::Children(_) => None,
        }
    }

    /// Child list of a container; empty for text leaves.
    pub fn children(&self) -> &[Node] {
        match &self.content {
            NodeContent::Children(children) => children.as_slice(),
            NodeContent::Text(_) => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.content {
            NodeContent::Children(children) => Some(children),
            NodeContent::Text(_) => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Returns the stable block id when one has been assigned.
    pub fn block_id(&self) -> Option<&str> {
        self.attrs.get(BLOCK_ID_ATTR).and_then(AttrValue::as_str)
    }

    pub fn has_mark(&self, type_name: &str) -> bool {
        self.marks.iter().any(|mark| mark.type_name == type_name)
    }

    /// Adds a mark unless one of the same type is already present.
    ///
    /// Returns `true` when the mark list changed.
    pub fn add_mark(&mut self, mark: Mark) -> bool {
        if self.has_mark(mark.type_name.as_str()) {
            return false;
        }
        self.marks.push(mark);
        true
    }

    pub fn remove_mark(&mut self, type_name: &str) -> bool {
        let before = self.marks.len();
        self.marks.retain(|mark| mark.type_name != type_name);
        before != self.marks.len()
    }

    /// Concatenated text of every text leaf below this node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Resolves a child path relative to this node.
    pub fn node_at(&self, path: &Path) -> Option<&Node> {
        let mut cursor = self;
        for index in path.indices() {
            cursor = cursor.children().get(*index)?;
        }
        Some(cursor)
    }

    pub fn node_at_mut(&mut self, path: &Path) -> Option<&mut Node> {
        let mut cursor = self;
        for index in path.indices() {
            cursor = cursor.children_mut()?.get_mut(*index)?;
        }
        Some(cursor)
    }

    /// Visits every node in document order together with its path.
    ///
    /// The callback returns `false` to skip the visited node's subtree.
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&Path, &Node) -> bool,
    {
        walk_inner(self, &mut Path::root(), visit);
    }

    /// Finds the path of the node carrying `block_id`.
    pub fn find_block(&self, block_id: &str) -> Option<Path> {
        let mut found = None;
        self.walk(&mut |path, node| {
            if found.is_some() {
                return false;
            }
            if node.block_id() == Some(block_id) {
                found = Some(path.clone());
                return false;
            }
            true
        });
        found
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Node::node_count).sum::<usize>()
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match &node.content {
        NodeContent::Text(text) => out.push_str(text),
        NodeContent::Children(children) => {
            for child in children {
                collect_text(child, out);
            }
        }
    }
}

fn walk_inner<F>(node: &Node, path: &mut Path, visit: &mut F)
where
    F: FnMut(&Path, &Node) -> bool,
{
    if !visit(path, node) {
        return;
    }
    for (index, child) in node.children().iter().enumerate() {
        path.push(index);
        walk_inner(child, path, visit);
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::{AttrValue, Attrs, Mark, Node, BLOCK_ID_ATTR};
    use crate::model::path::Path;

    fn sample() -> Node {
        let mut attrs = Attrs::new();
        attrs.insert(BLOCK_ID_ATTR.to_string(), AttrValue::from("b-1"));
        Node::element(
            "doc",
            Attrs::new(),
            vec![
                Node::element("paragraph", attrs, vec![Node::text("hello ")]),
                Node::element("paragraph", Attrs::new(), vec![Node::text("world")]),
            ],
        )
    }

    #[test]
    fn add_mark_is_idempotent_per_type() {
        let mut node = Node::text("x");
        assert!(node.add_mark(Mark::new("bold")));
        assert!(!node.add_mark(Mark::new("bold")));
        assert_eq!(node.marks.len(), 1);
        assert!(node.remove_mark("bold"));
        assert!(node.marks.is_empty());
    }

    #[test]
    fn text_content_concatenates_leaves() {
        assert_eq!(sample().text_content(), "hello world");
    }

    #[test]
    fn node_at_resolves_paths() {
        let doc = sample();
        let text = doc
            .node_at(&Path::from(vec![1, 0]))
            .expect("path should resolve");
        assert_eq!(text.text_value(), Some("world"));
        assert!(doc.node_at(&Path::from(vec![2])).is_none());
    }

    #[test]
    fn find_block_returns_path() {
        let doc = sample();
        assert_eq!(doc.find_block("b-1"), Some(Path::from(vec![0])));
        assert_eq!(doc.find_block("missing"), None);
    }

    #[test]
    fn serde_uses_type_field() {
        let json = serde_json::to_value(Node::text("a")).expect("serialize node");
        assert_eq!(json["type"], "text");
        assert_eq!(json["content"]["text"], "a");
    }
}
