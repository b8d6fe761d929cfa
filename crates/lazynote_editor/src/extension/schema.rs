//! Frozen document schema and tree validation.
//!
//! # Responsibility
//! - Hold the node/mark declarations collected by the extension registry.
//! - Normalize incoming nodes (fill attribute defaults, reject unknown keys,
//!   drop characters markup cannot carry, merge adjacent text leaves).
//! - Validate whole trees against content expressions before commit.
//!
//! # Invariants
//! - A schema always declares the `doc` top node and the `text` leaf type.
//! - Every content expression only references known types or groups.
//! - `validate` reports the first violation with the offending node path.
//! - A normalized container never holds two adjacent text leaves with equal
//!   marks.

use crate::extension::content::ContentExpr;
use crate::extension::kernel::RegistryError;
use crate::extension::spec::{AttrSpec, MarkSpec, NodeSpec, GROUP_INLINE};
use crate::model::node::{AttrValue, Attrs, Mark, Node, NodeContent};
use crate::model::path::Path;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Type name of the document root.
pub const TOP_NODE: &str = "doc";
/// Type name of text leaves.
pub const TEXT_NODE: &str = "text";

/// Schema violation with the offending node path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidRoot {
        type_name: String,
    },
    UnknownNodeType {
        path: Path,
        type_name: String,
    },
    UnknownMarkType {
        path: Path,
        type_name: String,
    },
    UnknownAttr {
        path: Path,
        type_name: String,
        attr: String,
    },
    MissingAttr {
        path: Path,
        type_name: String,
        attr: String,
    },
    InvalidAttrValue {
        path: Path,
        type_name: String,
        attr: String,
        expected: &'static str,
    },
    ShapeMismatch {
        path: Path,
        type_name: String,
        expected_text: bool,
    },
    EmptyText {
        path: Path,
    },
    MarkNotAllowed {
        path: Path,
        mark: String,
    },
    DuplicateMark {
        path: Path,
        mark: String,
    },
    ContentMismatch {
        path: Path,
        type_name: String,
        expr: String,
    },
}

impl SchemaError {
    /// Path of the offending node (root for `InvalidRoot`).
    pub fn path(&self) -> Path {
        match self {
            Self::InvalidRoot { .. } => Path::root(),
            Self::UnknownNodeType { path, .. }
            | Self::UnknownMarkType { path, .. }
            | Self::UnknownAttr { path, .. }
            | Self::MissingAttr { path, .. }
            | Self::InvalidAttrValue { path, .. }
            | Self::ShapeMismatch { path, .. }
            | Self::EmptyText { path }
            | Self::MarkNotAllowed { path, .. }
            | Self::DuplicateMark { path, .. }
            | Self::ContentMismatch { path, .. } => path.clone(),
        }
    }

    /// Re-roots a path reported relative to a subtree.
    fn rebased(self, base: &Path) -> Self {
        let join = |path: Path| {
            let mut joined = base.clone();
            for index in path.indices() {
                joined.push(*index);
            }
            joined
        };
        match self {
            Self::InvalidRoot { type_name } => Self::InvalidRoot { type_name },
            Self::UnknownNodeType { path, type_name } => Self::UnknownNodeType {
                path: join(path),
                type_name,
            },
            Self::UnknownMarkType { path, type_name } => Self::UnknownMarkType {
                path: join(path),
                type_name,
            },
            Self::UnknownAttr {
                path,
                type_name,
                attr,
            } => Self::UnknownAttr {
                path: join(path),
                type_name,
                attr,
            },
            Self::MissingAttr {
                path,
                type_name,
                attr,
            } => Self::MissingAttr {
                path: join(path),
                type_name,
                attr,
            },
            Self::InvalidAttrValue {
                path,
                type_name,
                attr,
                expected,
            } => Self::InvalidAttrValue {
                path: join(path),
                type_name,
                attr,
                expected,
            },
            Self::ShapeMismatch {
                path,
                type_name,
                expected_text,
            } => Self::ShapeMismatch {
                path: join(path),
                type_name,
                expected_text,
            },
            Self::EmptyText { path } => Self::EmptyText { path: join(path) },
            Self::MarkNotAllowed { path, mark } => Self::MarkNotAllowed {
                path: join(path),
                mark,
            },
            Self::DuplicateMark { path, mark } => Self::DuplicateMark {
                path: join(path),
                mark,
            },
            Self::ContentMismatch {
                path,
                type_name,
                expr,
            } => Self::ContentMismatch {
                path: join(path),
                type_name,
                expr,
            },
        }
    }
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoot { type_name } => {
                write!(f, "document root must be `{TOP_NODE}`, got `{type_name}`")
            }
            Self::UnknownNodeType { path, type_name } => {
                write!(f, "unknown node type `{type_name}` at {path}")
            }
            Self::UnknownMarkType { path, type_name } => {
                write!(f, "unknown mark type `{type_name}` at {path}")
            }
            Self::UnknownAttr {
                path,
                type_name,
                attr,
            } => write!(f, "unknown attribute `{attr}` on `{type_name}` at {path}"),
            Self::MissingAttr {
                path,
                type_name,
                attr,
            } => write!(
                f,
                "missing required attribute `{attr}` on `{type_name}` at {path}"
            ),
            Self::InvalidAttrValue {
                path,
                type_name,
                attr,
                expected,
            } => write!(
                f,
                "attribute `{attr}` on `{type_name}` at {path} must be {expected}"
            ),
            Self::ShapeMismatch {
                path,
                type_name,
                expected_text,
            } => {
                let expected = if *expected_text { "text" } else { "container" };
                write!(f, "node `{type_name}` at {path} must be a {expected} node")
            }
            Self::EmptyText { path } => write!(f, "text node at {path} must not be empty"),
            Self::MarkNotAllowed { path, mark } => {
                write!(f, "mark `{mark}` is not allowed at {path}")
            }
            Self::DuplicateMark { path, mark } => {
                write!(f, "mark `{mark}` appears twice at {path}")
            }
            Self::ContentMismatch {
                path,
                type_name,
                expr,
            } => write!(
                f,
                "children of `{type_name}` at {path} do not match content `{expr}`"
            ),
        }
    }
}

impl Error for SchemaError {}

/// Immutable schema built by [`crate::extension::kernel::ExtensionRegistry`].
#[derive(Debug)]
pub struct Schema {
    nodes: BTreeMap<String, NodeSpec>,
    node_order: Vec<String>,
    marks: BTreeMap<String, MarkSpec>,
    mark_order: Vec<String>,
    content: BTreeMap<String, ContentExpr>,
}

impl Schema {
    /// Compiles declarations into a schema.
    ///
    /// Callers guarantee names are unique; the registry rejects duplicates
    /// before calling this.
    pub(crate) fn compile(
        node_specs: Vec<NodeSpec>,
        mark_specs: Vec<MarkSpec>,
    ) -> Result<Self, RegistryError> {
        let mut nodes = BTreeMap::new();
        let mut node_order = Vec::new();
        let mut content = BTreeMap::new();
        let mut groups = BTreeSet::new();

        for spec in node_specs {
            let expr = ContentExpr::parse(spec.content.as_str()).map_err(|err| {
                RegistryError::InvalidContentExpr {
                    type_name: spec.name.clone(),
                    message: err.to_string(),
                }
            })?;
            if let Some(group) = &spec.group {
                groups.insert(group.clone());
            }
            content.insert(spec.name.clone(), expr);
            node_order.push(spec.name.clone());
            nodes.insert(spec.name.clone(), spec);
        }

        if !nodes.contains_key(TOP_NODE) {
            return Err(RegistryError::MissingNodeType(TOP_NODE));
        }
        match nodes.get(TEXT_NODE) {
            Some(spec) if spec.is_text => {}
            _ => return Err(RegistryError::MissingNodeType(TEXT_NODE)),
        }

        for (type_name, expr) in &content {
            for name in expr.names() {
                if !nodes.contains_key(name.as_str()) && !groups.contains(name.as_str()) {
                    return Err(RegistryError::UnresolvedContentName {
                        type_name: type_name.clone(),
                        name,
                    });
                }
            }
        }

        let mut marks = BTreeMap::new();
        let mut mark_order = Vec::new();
        for spec in mark_specs {
            mark_order.push(spec.name.clone());
            marks.insert(spec.name.clone(), spec);
        }

        Ok(Self {
            nodes,
            node_order,
            marks,
            mark_order,
            content,
        })
    }

    pub fn node_spec(&self, type_name: &str) -> Option<&NodeSpec> {
        self.nodes.get(type_name)
    }

    pub fn mark_spec(&self, type_name: &str) -> Option<&MarkSpec> {
        self.marks.get(type_name)
    }

    /// Node specs in registration order.
    pub fn node_specs(&self) -> impl Iterator<Item = &NodeSpec> {
        self.node_order.iter().filter_map(|name| self.nodes.get(name))
    }

    /// Mark specs in registration order.
    pub fn mark_specs(&self) -> impl Iterator<Item = &MarkSpec> {
        self.mark_order.iter().filter_map(|name| self.marks.get(name))
    }

    pub fn has_block_id(&self, type_name: &str) -> bool {
        self.node_spec(type_name).is_some_and(NodeSpec::has_block_id)
    }

    /// Whether containers of `type_name` hold inline content (text blocks).
    pub fn is_textblock(&self, type_name: &str) -> bool {
        self.content.get(type_name).is_some_and(|expr| {
            let names = expr.names();
            names.contains(TEXT_NODE) || names.contains(GROUP_INLINE)
        })
    }

    /// Whether the type declares no content (atom such as `hr` or `image`).
    pub fn is_atom(&self, type_name: &str) -> bool {
        self.node_spec(type_name)
            .is_some_and(|spec| !spec.is_text)
            && self.content.get(type_name).is_some_and(ContentExpr::is_empty)
    }

    /// Creates a normalized container node.
    pub fn node(
        &self,
        type_name: &str,
        attrs: Attrs,
        children: Vec<Node>,
    ) -> Result<Node, SchemaError> {
        self.normalize(Node::element(type_name, attrs, children))
    }

    /// Creates a normalized text leaf.
    pub fn text(&self, text: &str, marks: Vec<Mark>) -> Result<Node, SchemaError> {
        self.normalize(Node::marked_text(text, marks))
    }

    /// Creates a normalized mark.
    pub fn mark(&self, type_name: &str, attrs: Attrs) -> Result<Mark, SchemaError> {
        let spec = self
            .mark_spec(type_name)
            .ok_or_else(|| SchemaError::UnknownMarkType {
                path: Path::root(),
                type_name: type_name.to_string(),
            })?;
        let attrs = fill_attrs(&Path::root(), type_name, &spec.attrs, attrs)?;
        Ok(Mark::with_attrs(type_name, attrs))
    }

    /// Fills attribute defaults and checks types, keys and shape recursively.
    ///
    /// Content expressions are not checked here; see [`Schema::validate`].
    pub fn normalize(&self, node: Node) -> Result<Node, SchemaError> {
        self.normalize_at(node, &mut Path::root())
    }

    /// Normalizes a node that will live at `base` in a larger tree.
    pub fn normalize_under(&self, node: Node, base: &Path) -> Result<Node, SchemaError> {
        self.normalize(node).map_err(|err| err.rebased(base))
    }

    fn normalize_at(&self, node: Node, path: &mut Path) -> Result<Node, SchemaError> {
        let spec = self
            .node_spec(node.type_name.as_str())
            .ok_or_else(|| SchemaError::UnknownNodeType {
                path: path.clone(),
                type_name: node.type_name.clone(),
            })?;
        if spec.is_text != node.is_text() {
            return Err(SchemaError::ShapeMismatch {
                path: path.clone(),
                type_name: node.type_name.clone(),
                expected_text: spec.is_text,
            });
        }

        let attrs = fill_attrs(path, node.type_name.as_str(), &spec.attrs, node.attrs)?;
        let mut marks = Vec::with_capacity(node.marks.len());
        for mark in node.marks {
            let mark_spec =
                self.mark_spec(mark.type_name.as_str())
                    .ok_or_else(|| SchemaError::UnknownMarkType {
                        path: path.clone(),
                        type_name: mark.type_name.clone(),
                    })?;
            let mark_attrs = fill_attrs(path, mark.type_name.as_str(), &mark_spec.attrs, mark.attrs)?;
            marks.push(Mark::with_attrs(mark.type_name, mark_attrs));
        }

        let content = match node.content {
            NodeContent::Text(text) => NodeContent::Text(strip_non_xml(text)),
            NodeContent::Children(children) => {
                let mut normalized = Vec::with_capacity(children.len());
                for (index, child) in children.into_iter().enumerate() {
                    path.push(index);
                    let result = self.normalize_at(child, path);
                    path.pop();
                    normalized.push(result?);
                }
                NodeContent::Children(merge_text_runs(normalized))
            }
        };

        Ok(Node {
            type_name: node.type_name,
            attrs,
            content,
            marks,
        })
    }

    /// Validates a complete document.
    pub fn validate(&self, doc: &Node) -> Result<(), SchemaError> {
        if doc.type_name != TOP_NODE {
            return Err(SchemaError::InvalidRoot {
                type_name: doc.type_name.clone(),
            });
        }
        self.validate_node(doc, &mut Path::root(), true)
    }

    /// Checks that `children` would be valid content for `parent_type`.
    pub fn content_matches(&self, parent_type: &str, children: &[Node]) -> bool {
        let Some(expr) = self.content.get(parent_type) else {
            return false;
        };
        expr.matches(children, &|name: &str, child: &Node| {
            self.type_matches(name, child.type_name.as_str())
        })
    }

    /// Whether expression `name` (type or group) admits `type_name`.
    pub fn type_matches(&self, name: &str, type_name: &str) -> bool {
        if name == type_name {
            return true;
        }
        self.node_spec(type_name)
            .is_some_and(|spec| spec.is_in_group(name))
    }

    fn validate_node(
        &self,
        node: &Node,
        path: &mut Path,
        parent_allows_marks: bool,
    ) -> Result<(), SchemaError> {
        let spec = self
            .node_spec(node.type_name.as_str())
            .ok_or_else(|| SchemaError::UnknownNodeType {
                path: path.clone(),
                type_name: node.type_name.clone(),
            })?;
        if spec.is_text != node.is_text() {
            return Err(SchemaError::ShapeMismatch {
                path: path.clone(),
                type_name: node.type_name.clone(),
                expected_text: spec.is_text,
            });
        }
        check_attrs(path, node.type_name.as_str(), &spec.attrs, &node.attrs)?;

        match &node.content {
            NodeContent::Text(text) => {
                if text.is_empty() {
                    return Err(SchemaError::EmptyText { path: path.clone() });
                }
                self.validate_marks(node, path, parent_allows_marks)
            }
            NodeContent::Children(children) => {
                if let Some(mark) = node.marks.first() {
                    return Err(SchemaError::MarkNotAllowed {
                        path: path.clone(),
                        mark: mark.type_name.clone(),
                    });
                }
                for (index, child) in children.iter().enumerate() {
                    path.push(index);
                    let result = self.validate_node(child, path, spec.allows_marks);
                    path.pop();
                    result?;
                }
                if !self.content_matches(node.type_name.as_str(), children) {
                    return Err(SchemaError::ContentMismatch {
                        path: path.clone(),
                        type_name: node.type_name.clone(),
                        expr: spec.content.clone(),
                    });
                }
                Ok(())
            }
        }
    }

    fn validate_marks(
        &self,
        node: &Node,
        path: &Path,
        parent_allows_marks: bool,
    ) -> Result<(), SchemaError> {
        let mut seen = BTreeSet::new();
        for mark in &node.marks {
            if !parent_allows_marks {
                return Err(SchemaError::MarkNotAllowed {
                    path: path.clone(),
                    mark: mark.type_name.clone(),
                });
            }
            let spec = self
                .mark_spec(mark.type_name.as_str())
                .ok_or_else(|| SchemaError::UnknownMarkType {
                    path: path.clone(),
                    type_name: mark.type_name.clone(),
                })?;
            if !seen.insert(mark.type_name.as_str()) {
                return Err(SchemaError::DuplicateMark {
                    path: path.clone(),
                    mark: mark.type_name.clone(),
                });
            }
            check_attrs(path, mark.type_name.as_str(), &spec.attrs, &mark.attrs)?;
        }
        Ok(())
    }
}

fn fill_attrs(
    path: &Path,
    type_name: &str,
    declared: &[(String, AttrSpec)],
    attrs: Attrs,
) -> Result<Attrs, SchemaError> {
    let mut attrs: Attrs = attrs
        .into_iter()
        .map(|(key, value)| (key, sanitize_attr(value)))
        .collect();
    for (key, spec) in declared {
        if attrs.contains_key(key) {
            continue;
        }
        match &spec.default {
            Some(default) => {
                attrs.insert(key.clone(), default.clone());
            }
            None => {
                return Err(SchemaError::MissingAttr {
                    path: path.clone(),
                    type_name: type_name.to_string(),
                    attr: key.clone(),
                })
            }
        }
    }
    check_attrs(path, type_name, declared, &attrs)?;
    Ok(attrs)
}

fn check_attrs(
    path: &Path,
    type_name: &str,
    declared: &[(String, AttrSpec)],
    attrs: &Attrs,
) -> Result<(), SchemaError> {
    for (key, value) in attrs {
        let Some((_, spec)) = declared.iter().find(|(name, _)| name == key) else {
            return Err(SchemaError::UnknownAttr {
                path: path.clone(),
                type_name: type_name.to_string(),
                attr: key.clone(),
            });
        };
        if !spec.accepts(value) {
            return Err(SchemaError::InvalidAttrValue {
                path: path.clone(),
                type_name: type_name.to_string(),
                attr: key.clone(),
                expected: spec.kind.as_str(),
            });
        }
    }
    for (key, _) in declared {
        if !attrs.contains_key(key) {
            return Err(SchemaError::MissingAttr {
                path: path.clone(),
                type_name: type_name.to_string(),
                attr: key.clone(),
            });
        }
    }
    Ok(())
}

/// Whether `c` is allowed in XML 1.0 character data.
pub fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Drops characters the markup format cannot carry.
pub fn strip_non_xml(text: String) -> String {
    if text.chars().all(is_xml_char) {
        return text;
    }
    text.chars().filter(|c| is_xml_char(*c)).collect()
}

/// [`strip_non_xml`] for string attribute values.
pub fn sanitize_attr(value: AttrValue) -> AttrValue {
    match value {
        AttrValue::Str(text) => AttrValue::Str(strip_non_xml(text)),
        other => other,
    }
}

/// Folds adjacent text leaves with equal marks into one leaf.
fn merge_text_runs(children: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        if let Some(last) = merged.last_mut() {
            if last.marks == child.marks {
                if let (NodeContent::Text(head), NodeContent::Text(tail)) =
                    (&mut last.content, &child.content)
                {
                    head.push_str(tail);
                    continue;
                }
            }
        }
        merged.push(child);
    }
    merged
}

/// Reads an integer attribute, falling back to `default`.
pub fn int_attr(node: &Node, key: &str, default: i64) -> i64 {
    node.attr(key).and_then(AttrValue::as_int).unwrap_or(default)
}
