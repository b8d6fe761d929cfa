//! Renderer-agnostic view description.
//!
//! # Responsibility
//! - Turn document nodes into an abstract element tree (`ViewNode`) using the
//!   per-type render functions registered in the schema.
//! - Define the element description (`DomElement`) that parse rules inspect
//!   when markup is read back.
//!
//! # Invariants
//! - Rendering is pure: the same node always yields the same view.
//! - Marks wrap text in schema mark order (first mark outermost).

use crate::extension::schema::Schema;
use crate::model::node::{Node, NodeContent};
use std::collections::BTreeMap;

/// Element template produced by a node or mark render function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomSpec {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub content: DomContent,
}

/// Where a node's children go inside its element template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomContent {
    /// Children render directly inside this element.
    Hole,
    /// Element never has children.
    Leaf,
    /// Children render inside a nested wrapper element.
    Wrap(Box<DomSpec>),
}

impl DomSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            content: DomContent::Hole,
        }
    }

    pub fn leaf(tag: impl Into<String>) -> Self {
        Self {
            content: DomContent::Leaf,
            ..Self::new(tag)
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    /// Adds an attribute only when `value` is present.
    pub fn attr_opt(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.attr(key, value),
            None => self,
        }
    }

    pub fn wrap(mut self, inner: DomSpec) -> Self {
        self.content = DomContent::Wrap(Box::new(inner));
        self
    }

    /// Number of wrapper elements between this element and the content hole.
    pub fn wrapper_depth(&self) -> usize {
        match &self.content {
            DomContent::Wrap(inner) => 1 + inner.wrapper_depth(),
            DomContent::Hole | DomContent::Leaf => 0,
        }
    }

    /// Expands the template with rendered children.
    fn into_view(self, children: Vec<ViewNode>) -> ViewNode {
        let inner = match self.content {
            DomContent::Hole => children,
            DomContent::Leaf => Vec::new(),
            DomContent::Wrap(wrapper) => vec![wrapper.into_view(children)],
        };
        ViewNode::Element {
            tag: self.tag,
            attrs: self.attrs,
            children: inner,
        }
    }
}

/// Abstract view tree consumed by renderers (markup, terminal, canvas...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNode {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<ViewNode>,
    },
    Text(String),
}

/// Parsed element as seen by parse rules.
///
/// `inner` is the first child element, so rules for wrapped templates
/// (for example `<pre><code class=..>`) can read wrapper attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomElement {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub inner: Option<Box<DomElement>>,
}

impl DomElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|value| value.split_whitespace().any(|item| item == class))
    }
}

/// Renders a node subtree to its abstract view.
///
/// Unregistered types fall back to a `div` carrying `data-node-type`, so a
/// view can always be produced for diagnostics.
pub fn render_node(schema: &Schema, node: &Node) -> ViewNode {
    match &node.content {
        NodeContent::Text(text) => render_text(schema, node, text),
        NodeContent::Children(children) => {
            let spec = match schema.node_spec(node.type_name.as_str()) {
                Some(spec) => (spec.render)(node),
                None => DomSpec::new("div").attr("data-node-type", node.type_name.as_str()),
            };
            let rendered = children
                .iter()
                .map(|child| render_node(schema, child))
                .collect();
            spec.into_view(rendered)
        }
    }
}

fn render_text(schema: &Schema, node: &Node, text: &str) -> ViewNode {
    let mut view = ViewNode::Text(text.to_string());
    for mark in node.marks.iter().rev() {
        let spec = match schema.mark_spec(mark.type_name.as_str()) {
            Some(spec) => (spec.render)(mark),
            None => DomSpec::new("span").attr("data-mark-type", mark.type_name.as_str()),
        };
        view = spec.into_view(vec![view]);
    }
    view
}

#[cfg(test)]
mod tests {
    use super::{DomElement, DomSpec, ViewNode};

    #[test]
    fn wrapped_template_places_children_in_innermost_element() {
        let spec = DomSpec::new("pre").wrap(DomSpec::new("code").attr("class", "language-rust"));
        assert_eq!(spec.wrapper_depth(), 1);
        let view = spec.into_view(vec![ViewNode::Text("fn main() {}".to_string())]);
        let ViewNode::Element { tag, children, .. } = view else {
            panic!("expected element");
        };
        assert_eq!(tag, "pre");
        assert!(matches!(
            &children[0],
            ViewNode::Element { tag, children, .. }
                if tag == "code" && children.len() == 1
        ));
    }

    #[test]
    fn leaf_template_drops_children() {
        let view = DomSpec::leaf("hr").into_view(vec![ViewNode::Text("x".to_string())]);
        assert_eq!(
            view,
            ViewNode::Element {
                tag: "hr".to_string(),
                attrs: vec![],
                children: vec![],
            }
        );
    }

    #[test]
    fn class_lookup_splits_on_whitespace() {
        let element = DomElement::new("div").with_attr("class", "callout note");
        assert!(element.has_class("callout"));
        assert!(!element.has_class("call"));
    }
}
