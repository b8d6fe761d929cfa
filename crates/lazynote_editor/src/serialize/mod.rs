//! Markup storage format.
//!
//! # Responsibility
//! - Write documents as XHTML-like markup through the registered render
//!   functions.
//! - Read markup back through the registered parse rules.
//!
//! # Invariants
//! - `deserialize(serialize(doc))` is structurally equal to `doc`.
//! - No whitespace is emitted between elements; text content is written
//!   verbatim (escaped), so code blocks keep their layout.
//! - Deserialized documents are normalized and validated before return.

use crate::extension::schema::{Schema, SchemaError, TEXT_NODE, TOP_NODE};
use crate::model::document::Document;
use crate::model::node::{Attrs, Mark, Node};
use crate::render::{render_node, DomElement, ViewNode};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Markup read failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    /// Input is not well-formed markup.
    Malformed(String),
    /// Root element is not a document container.
    InvalidRoot(String),
    /// A wrapped template is missing its inner element.
    MissingWrapper { type_name: String },
    /// Non-whitespace text outside of a text block.
    StrayText { parent: String },
    /// The decoded tree does not satisfy the schema.
    Schema(SchemaError),
}

impl Display for SerializeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "malformed markup: {message}"),
            Self::InvalidRoot(tag) => write!(f, "root element `{tag}` is not a document"),
            Self::MissingWrapper { type_name } => {
                write!(f, "`{type_name}` element is missing its inner wrapper")
            }
            Self::StrayText { parent } => write!(f, "text is not allowed directly in `{parent}`"),
            Self::Schema(err) => write!(f, "decoded document is invalid: {err}"),
        }
    }
}

impl Error for SerializeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchemaError> for SerializeError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<roxmltree::Error> for SerializeError {
    fn from(value: roxmltree::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

/// Writes `doc` as markup.
pub fn serialize(schema: &Schema, doc: &Node) -> String {
    let mut out = String::new();
    write_view(&render_node(schema, doc), &mut out);
    out
}

/// Writes an abstract view tree as markup.
pub fn write_view(view: &ViewNode, out: &mut String) {
    match view {
        ViewNode::Text(text) => escape_into(text, false, out),
        ViewNode::Element {
            tag,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                write_view(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Escapes `value` so a conforming parser reads back the same characters.
///
/// Parsers fold `\r\n` and bare `\r` to `\n` everywhere and turn literal
/// whitespace in attribute values into spaces; character references survive
/// both passes.
fn escape_into(value: &str, attribute: bool, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '"' if attribute => out.push_str("&quot;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\t' if attribute => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
}

/// Reads markup produced by [`serialize`] (or hand-written equivalents).
///
/// Unknown elements are unwrapped; whitespace-only text outside text blocks
/// is ignored.
pub fn deserialize(schema: &Schema, markup: &str) -> Result<Document, SerializeError> {
    let xml = roxmltree::Document::parse(markup)?;
    let root = xml.root_element();
    let element = dom_element(root);
    let doc_rule = schema
        .node_spec(TOP_NODE)
        .and_then(|spec| spec.parse)
        .and_then(|parse| parse(&element));
    let Some(attrs) = doc_rule else {
        return Err(SerializeError::InvalidRoot(element.tag));
    };

    let reader = Reader { schema };
    let children = reader.children(root, TOP_NODE, &[])?;
    let doc = schema.normalize(Node::element(TOP_NODE, attrs, children))?;
    schema.validate(&doc)?;
    debug!(
        "event=deserialize module=serialize status=ok nodes={}",
        doc.node_count()
    );
    Ok(Document::new(doc))
}

struct Reader<'s> {
    schema: &'s Schema,
}

impl Reader<'_> {
    fn children(
        &self,
        parent: roxmltree::Node<'_, '_>,
        parent_type: &str,
        marks: &[Mark],
    ) -> Result<Vec<Node>, SerializeError> {
        let mut out = Vec::new();
        for child in parent.children() {
            if child.is_text() {
                let text = child.text().unwrap_or_default();
                if self.schema.is_textblock(parent_type) {
                    if !text.is_empty() {
                        out.push(Node::marked_text(text, marks.to_vec()));
                    }
                } else if !text.trim().is_empty() {
                    return Err(SerializeError::StrayText {
                        parent: parent_type.to_string(),
                    });
                }
                continue;
            }
            if !child.is_element() {
                continue;
            }

            let element = dom_element(child);
            if let Some((type_name, attrs)) = self.match_node(&element) {
                out.push(self.node(child, type_name, attrs)?);
            } else if let Some(mark) = self.match_mark(&element) {
                let mut nested = marks.to_vec();
                nested.push(mark);
                out.extend(self.children(child, parent_type, &nested)?);
            } else {
                out.extend(self.children(child, parent_type, marks)?);
            }
        }
        Ok(out)
    }

    fn node(
        &self,
        element: roxmltree::Node<'_, '_>,
        type_name: &str,
        attrs: Attrs,
    ) -> Result<Node, SerializeError> {
        if self.schema.is_atom(type_name) {
            return Ok(Node::element(type_name, attrs, Vec::new()));
        }
        let depth = self
            .schema
            .node_spec(type_name)
            .map(|spec| (spec.render)(&Node::element(type_name, attrs.clone(), Vec::new())))
            .map_or(0, |template| template.wrapper_depth());
        let mut content = element;
        for _ in 0..depth {
            content = content
                .children()
                .find(|child| child.is_element())
                .ok_or_else(|| SerializeError::MissingWrapper {
                    type_name: type_name.to_string(),
                })?;
        }
        let children = self.children(content, type_name, &[])?;
        Ok(Node::element(type_name, attrs, children))
    }

    /// First node rule (registration order) accepting the element.
    fn match_node<'a>(&'a self, element: &DomElement) -> Option<(&'a str, Attrs)> {
        self.schema
            .node_specs()
            .filter(|spec| spec.name != TOP_NODE && spec.name != TEXT_NODE)
            .find_map(|spec| {
                let parse = spec.parse?;
                parse(element).map(|attrs| (spec.name.as_str(), attrs))
            })
    }

    fn match_mark(&self, element: &DomElement) -> Option<Mark> {
        self.schema.mark_specs().find_map(|spec| {
            let parse = spec.parse?;
            parse(element).map(|attrs| Mark::with_attrs(spec.name.as_str(), attrs))
        })
    }
}

fn dom_element(node: roxmltree::Node<'_, '_>) -> DomElement {
    let mut element = DomElement::new(node.tag_name().name());
    for attribute in node.attributes() {
        element
            .attrs
            .insert(attribute.name().to_string(), attribute.value().to_string());
    }
    element.inner = node
        .children()
        .find(|child| child.is_element())
        .map(|child| Box::new(dom_element(child)));
    element
}
