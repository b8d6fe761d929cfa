//! Primitive document steps and their structural inverses.
//!
//! # Invariants
//! - Applying a step never mutates its input; a new tree is returned.
//! - Every successful application also returns the step that undoes it.
//! - Inserted nodes are normalized against the schema at step time;
//!   content expressions are only checked when a transaction commits.
//! - A non-null `blockId` is never replaced by a different id. Clearing it
//!   back to null stays allowed so assignments can be undone.

use crate::extension::schema::{sanitize_attr, Schema, SchemaError};
use crate::model::node::{AttrValue, Attrs, Node, NodeContent, BLOCK_ID_ATTR};
use crate::model::path::{Path, Range};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One primitive mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Inserts `nodes` so the first lands at `at` (parent path + index).
    Insert { at: Path, nodes: Vec<Node> },
    /// Removes the sibling range.
    Delete { range: Range },
    /// Merges `attrs` into the attributes of the node at `path`.
    SetAttrs { path: Path, attrs: Attrs },
    /// Replaces the sibling range with `fragment`.
    ReplaceRange { range: Range, fragment: Vec<Node> },
}

/// Step application errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    RootNotAddressable,
    PathNotFound(Path),
    NotAContainer(Path),
    IndexOutOfBounds { parent: Path, index: usize, len: usize },
    InvalidRange { range: Range, len: usize },
    TextOffsetOutOfBounds { path: Path, offset: usize, len: usize },
    UnknownAttr { path: Path, attr: String },
    InvalidAttrValue { path: Path, attr: String },
    /// The node already carries a different block id.
    BlockIdReassigned { path: Path, current: String },
    InvalidNode(SchemaError),
}

impl Display for StepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootNotAddressable => write!(f, "the document root cannot be inserted or removed"),
            Self::PathNotFound(path) => write!(f, "no node at {path}"),
            Self::NotAContainer(path) => write!(f, "node at {path} is not a container"),
            Self::IndexOutOfBounds { parent, index, len } => write!(
                f,
                "index {index} out of bounds for {parent} with {len} children"
            ),
            Self::InvalidRange { range, len } => {
                write!(f, "range {range} is invalid for a container with {len} children")
            }
            Self::TextOffsetOutOfBounds { path, offset, len } => write!(
                f,
                "text offset {offset} out of bounds for text at {path} with {len} chars"
            ),
            Self::UnknownAttr { path, attr } => {
                write!(f, "attribute `{attr}` is not declared for node at {path}")
            }
            Self::InvalidAttrValue { path, attr } => {
                write!(f, "attribute `{attr}` has an invalid value for node at {path}")
            }
            Self::BlockIdReassigned { path, current } => {
                write!(f, "node at {path} already has block id {current}")
            }
            Self::InvalidNode(err) => write!(f, "invalid node: {err}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidNode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchemaError> for StepError {
    fn from(value: SchemaError) -> Self {
        Self::InvalidNode(value)
    }
}

impl Step {
    pub fn insert(at: Path, nodes: Vec<Node>) -> Self {
        Self::Insert { at, nodes }
    }

    pub fn delete(range: Range) -> Self {
        Self::Delete { range }
    }

    pub fn set_attrs(path: Path, attrs: Attrs) -> Self {
        Self::SetAttrs { path, attrs }
    }

    pub fn replace_range(range: Range, fragment: Vec<Node>) -> Self {
        Self::ReplaceRange { range, fragment }
    }

    /// Short step kind for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Delete { .. } => "delete",
            Self::SetAttrs { .. } => "set_attrs",
            Self::ReplaceRange { .. } => "replace_range",
        }
    }

    /// Applies the step to `doc`, returning the new tree and the inverse step.
    pub fn apply(&self, schema: &Schema, doc: &Node) -> Result<(Node, Step), StepError> {
        let mut root = doc.clone();
        let inverse = match self {
            Self::Insert { at, nodes } => {
                let (parent, index) = at.split_last().ok_or(StepError::RootNotAddressable)?;
                let normalized = normalize_fragment(schema, nodes, &parent, index)?;
                let count = normalized.len();
                let children = container_mut(&mut root, &parent)?;
                if index > children.len() {
                    return Err(StepError::IndexOutOfBounds {
                        parent,
                        index,
                        len: children.len(),
                    });
                }
                children.splice(index..index, normalized);
                Step::Delete {
                    range: Range::new(parent, index, index + count),
                }
            }
            Self::Delete { range } => {
                let children = container_mut(&mut root, &range.parent)?;
                check_range(range, children.len())?;
                let removed: Vec<Node> = children.drain(range.from..range.to).collect();
                Step::Insert {
                    at: range.parent.child(range.from),
                    nodes: removed,
                }
            }
            Self::SetAttrs { path, attrs } => {
                let node = root
                    .node_at_mut(path)
                    .ok_or_else(|| StepError::PathNotFound(path.clone()))?;
                let spec = schema
                    .node_spec(node.type_name.as_str())
                    .ok_or_else(|| {
                        StepError::InvalidNode(SchemaError::UnknownNodeType {
                            path: path.clone(),
                            type_name: node.type_name.clone(),
                        })
                    })?;
                let mut previous = Attrs::new();
                for (key, value) in attrs {
                    let attr_spec =
                        spec.attr_spec(key.as_str())
                            .ok_or_else(|| StepError::UnknownAttr {
                                path: path.clone(),
                                attr: key.clone(),
                            })?;
                    let value = sanitize_attr(value.clone());
                    if !attr_spec.accepts(&value) {
                        return Err(StepError::InvalidAttrValue {
                            path: path.clone(),
                            attr: key.clone(),
                        });
                    }
                    if key == BLOCK_ID_ATTR && !value.is_null() {
                        if let Some(current) = node.attrs.get(key).and_then(AttrValue::as_str) {
                            if value.as_str() != Some(current) {
                                return Err(StepError::BlockIdReassigned {
                                    path: path.clone(),
                                    current: current.to_string(),
                                });
                            }
                        }
                    }
                    let old = node
                        .attrs
                        .insert(key.clone(), value)
                        .unwrap_or(AttrValue::Null);
                    previous.insert(key.clone(), old);
                }
                Step::SetAttrs {
                    path: path.clone(),
                    attrs: previous,
                }
            }
            Self::ReplaceRange { range, fragment } => {
                let normalized = normalize_fragment(schema, fragment, &range.parent, range.from)?;
                let count = normalized.len();
                let children = container_mut(&mut root, &range.parent)?;
                check_range(range, children.len())?;
                let removed: Vec<Node> = children.splice(range.from..range.to, normalized).collect();
                Step::ReplaceRange {
                    range: Range::new(range.parent.clone(), range.from, range.from + count),
                    fragment: removed,
                }
            }
        };
        Ok((root, inverse))
    }
}

/// Builds a step that replaces chars `[from, to)` of the text leaf at
/// `text_path` with `insert`, keeping the leaf's marks.
///
/// The leaf is dropped when the edit leaves it empty, since empty text
/// leaves are not valid document content.
pub fn text_edit(
    doc: &Node,
    text_path: &Path,
    from: usize,
    to: usize,
    insert: &str,
) -> Result<Step, StepError> {
    let node = doc
        .node_at(text_path)
        .ok_or_else(|| StepError::PathNotFound(text_path.clone()))?;
    let NodeContent::Text(text) = &node.content else {
        return Err(StepError::PathNotFound(text_path.clone()));
    };
    let len = text.chars().count();
    if from > to || to > len {
        return Err(StepError::TextOffsetOutOfBounds {
            path: text_path.clone(),
            offset: to.max(from),
            len,
        });
    }

    let mut edited: String = text.chars().take(from).collect();
    edited.push_str(insert);
    edited.extend(text.chars().skip(to));

    let range = Range::single(text_path).ok_or(StepError::RootNotAddressable)?;
    let fragment = if edited.is_empty() {
        Vec::new()
    } else {
        let mut replacement = node.clone();
        replacement.content = NodeContent::Text(edited);
        vec![replacement]
    };
    Ok(Step::replace_range(range, fragment))
}

fn container_mut<'a>(root: &'a mut Node, path: &Path) -> Result<&'a mut Vec<Node>, StepError> {
    let node = root
        .node_at_mut(path)
        .ok_or_else(|| StepError::PathNotFound(path.clone()))?;
    node.children_mut()
        .ok_or_else(|| StepError::NotAContainer(path.clone()))
}

fn check_range(range: &Range, len: usize) -> Result<(), StepError> {
    if range.from > range.to || range.to > len {
        return Err(StepError::InvalidRange {
            range: range.clone(),
            len,
        });
    }
    Ok(())
}

fn normalize_fragment(
    schema: &Schema,
    nodes: &[Node],
    parent: &Path,
    start: usize,
) -> Result<Vec<Node>, StepError> {
    nodes
        .iter()
        .enumerate()
        .map(|(offset, node)| {
            schema
                .normalize_under(node.clone(), &parent.child(start + offset))
                .map_err(StepError::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{text_edit, Step, StepError};
    use crate::extension::kernel::ExtensionRegistry;
    use crate::extension::schema::Schema;
    use crate::model::node::{AttrValue, Attrs, Node};
    use crate::model::path::{Path, Range};
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        ExtensionRegistry::with_builtins()
            .expect("builtins")
            .build()
            .expect("schema")
            .schema
    }

    fn doc(schema: &Schema) -> Node {
        let para = |text: &str| {
            schema
                .node("paragraph", Attrs::new(), vec![Node::text(text)])
                .expect("paragraph")
        };
        schema
            .node("doc", Attrs::new(), vec![para("one"), para("two")])
            .expect("doc")
    }

    #[test]
    fn insert_then_inverse_restores_tree() {
        let schema = schema();
        let base = doc(&schema);
        let step = Step::insert(
            Path::from(vec![1]),
            vec![Node::element("paragraph", Attrs::new(), vec![Node::text("new")])],
        );
        let (next, inverse) = step.apply(&schema, &base).expect("insert applies");
        assert_eq!(next.children().len(), 3);
        assert_eq!(next.children()[1].text_content(), "new");
        assert!(next.children()[1].attr("blockId").is_some());

        let (restored, _) = inverse.apply(&schema, &next).expect("inverse applies");
        assert_eq!(restored, base);
    }

    #[test]
    fn delete_rejects_out_of_range() {
        let schema = schema();
        let base = doc(&schema);
        let err = Step::delete(Range::new(Path::root(), 1, 5))
            .apply(&schema, &base)
            .expect_err("range past end must fail");
        assert!(matches!(err, StepError::InvalidRange { len: 2, .. }));
    }

    #[test]
    fn set_attrs_rejects_unknown_keys_and_inverts() {
        let schema = schema();
        let base = doc(&schema);
        let mut attrs = Attrs::new();
        attrs.insert("colour".to_string(), AttrValue::from("red"));
        let err = Step::set_attrs(Path::from(vec![0]), attrs)
            .apply(&schema, &base)
            .expect_err("unknown attr must fail");
        assert!(matches!(err, StepError::UnknownAttr { .. }));

        let mut attrs = Attrs::new();
        attrs.insert("blockId".to_string(), AttrValue::from("b-1"));
        let (next, inverse) = Step::set_attrs(Path::from(vec![0]), attrs)
            .apply(&schema, &base)
            .expect("declared attr applies");
        assert_eq!(next.children()[0].block_id(), Some("b-1"));
        let (restored, _) = inverse.apply(&schema, &next).expect("inverse applies");
        assert_eq!(restored, base);
    }

    #[test]
    fn set_attrs_keeps_an_existing_block_id() {
        let schema = schema();
        let base = doc(&schema);
        let set_id = |id: &str| {
            let mut attrs = Attrs::new();
            attrs.insert("blockId".to_string(), AttrValue::from(id));
            Step::set_attrs(Path::from(vec![0]), attrs)
        };
        let (assigned, clear) = set_id("b-1").apply(&schema, &base).expect("first id");

        let err = set_id("hijacked")
            .apply(&schema, &assigned)
            .expect_err("existing id must not be replaced");
        assert_eq!(
            err,
            StepError::BlockIdReassigned {
                path: Path::from(vec![0]),
                current: "b-1".to_string(),
            }
        );
        let (same, _) = set_id("b-1")
            .apply(&schema, &assigned)
            .expect("writing the same id is a no-op");
        assert_eq!(same, assigned);

        let (cleared, _) = clear.apply(&schema, &assigned).expect("clearing applies");
        assert!(cleared.children()[0].block_id().is_none());
    }

    #[test]
    fn replace_range_swaps_fragment() {
        let schema = schema();
        let base = doc(&schema);
        let step = Step::replace_range(
            Range::new(Path::root(), 0, 2),
            vec![Node::element("horizontal_rule", Attrs::new(), vec![])],
        );
        let (next, inverse) = step.apply(&schema, &base).expect("replace applies");
        assert_eq!(next.children().len(), 1);
        assert_eq!(next.children()[0].type_name, "horizontal_rule");
        let (restored, _) = inverse.apply(&schema, &next).expect("inverse applies");
        assert_eq!(restored, base);
    }

    #[test]
    fn insert_rejects_unregistered_types() {
        let schema = schema();
        let base = doc(&schema);
        let err = Step::insert(
            Path::from(vec![0]),
            vec![Node::element("marquee", Attrs::new(), vec![])],
        )
        .apply(&schema, &base)
        .expect_err("unknown type must fail");
        assert!(matches!(err, StepError::InvalidNode(_)));
    }

    #[test]
    fn text_edit_removes_emptied_leaf() {
        let schema = schema();
        let base = doc(&schema);
        let text_path = Path::from(vec![0, 0]);
        let step = text_edit(&base, &text_path, 0, 3, "").expect("edit step");
        let (next, _) = step.apply(&schema, &base).expect("edit applies");
        assert!(next.children()[0].children().is_empty());

        let step = text_edit(&base, &text_path, 1, 2, "NE").expect("edit step");
        let (next, _) = step.apply(&schema, &base).expect("edit applies");
        assert_eq!(next.children()[0].text_content(), "oNEe");
    }
}
