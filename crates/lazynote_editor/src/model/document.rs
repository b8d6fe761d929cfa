//! Immutable, shareable document version.
//!
//! # Invariants
//! - The root node is always a container; its type is checked by the schema.
//! - A `Document` is never mutated in place; edits produce a new value.

use crate::model::node::Node;
use std::ops::Deref;
use std::sync::Arc;

/// One committed (or candidate) document version.
///
/// Cloning is cheap and shares the underlying tree.
#[derive(Debug, Clone)]
pub struct Document {
    root: Arc<Node>,
}

impl Document {
    pub fn new(root: Node) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Whether both handles point at the same version.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// Clones the tree out for editing.
    pub fn to_node(&self) -> Node {
        self.root.as_ref().clone()
    }
}

impl Deref for Document {
    type Target = Node;

    fn deref(&self) -> &Self::Target {
        &self.root
    }
}

/// Structural equality; use [`Document::ptr_eq`] for identity.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.root == other.root
    }
}

impl Eq for Document {}

impl From<Node> for Document {
    fn from(value: Node) -> Self {
        Self::new(value)
    }
}
