//! Paste ingestion: markdown detection, conversion and plain-text fallback.
//!
//! # Responsibility
//! - Decide whether pasted text is markdown.
//! - Convert it to block nodes, or split plain text into paragraphs.
//!
//! # Invariants
//! - Conversion failures never surface: the text falls back to one plain
//!   paragraph.
//! - Pasted text is never logged; only sizes and outcomes are.

pub mod detect;
pub mod parse;

pub use detect::{is_markdown_like, markdown_signals, MarkdownSignal};
pub use parse::{parse_markdown, MarkdownError};

use crate::extension::schema::{Schema, SchemaError};
use crate::model::node::{Attrs, Node};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

static BLANK_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n\s*").expect("valid blank line regex"));

/// How pasted text was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteKind {
    Markdown,
    PlainText,
    /// Markdown conversion failed; the text became one plain paragraph.
    Fallback,
}

impl PasteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::PlainText => "plain_text",
            Self::Fallback => "fallback",
        }
    }
}

/// Nodes produced from pasted text.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub kind: PasteKind,
    pub nodes: Vec<Node>,
}

/// Converts clipboard text into block nodes.
///
/// With `markdown_enabled` off, text is always treated as plain.
pub fn ingest_text(
    schema: &Schema,
    text: &str,
    markdown_enabled: bool,
) -> Result<Ingested, SchemaError> {
    let text = text.replace("\r\n", "\n");
    if markdown_enabled && is_markdown_like(text.as_str()) {
        match parse_markdown(schema, text.as_str()) {
            Ok(nodes) => {
                debug!(
                    "event=paste_ingest module=markdown status=ok kind=markdown chars={} blocks={}",
                    text.chars().count(),
                    nodes.len()
                );
                return Ok(Ingested {
                    kind: PasteKind::Markdown,
                    nodes,
                });
            }
            Err(err) => {
                warn!(
                    "event=paste_ingest module=markdown status=fallback chars={} error={}",
                    text.chars().count(),
                    err
                );
                return Ok(Ingested {
                    kind: PasteKind::Fallback,
                    nodes: vec![plain_paragraph(schema, text.as_str())?],
                });
            }
        }
    }

    let nodes = plain_paragraphs(schema, text.as_str())?;
    debug!(
        "event=paste_ingest module=markdown status=ok kind=plain_text chars={} blocks={}",
        text.chars().count(),
        nodes.len()
    );
    Ok(Ingested {
        kind: PasteKind::PlainText,
        nodes,
    })
}

/// One paragraph holding `text` verbatim (empty text gives an empty
/// paragraph).
pub fn plain_paragraph(schema: &Schema, text: &str) -> Result<Node, SchemaError> {
    let children = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    };
    schema.node("paragraph", Attrs::new(), children)
}

/// Splits text into paragraphs on blank lines; single newlines become hard
/// breaks.
pub fn plain_paragraphs(schema: &Schema, text: &str) -> Result<Vec<Node>, SchemaError> {
    let trimmed = text.trim_matches('\n');
    if trimmed.trim().is_empty() {
        return Ok(vec![plain_paragraph(schema, "")?]);
    }
    BLANK_LINE_RE
        .split(trimmed)
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| {
            let mut children = Vec::new();
            for (index, line) in chunk.split('\n').enumerate() {
                if index > 0 {
                    children.push(Node::element("hard_break", Attrs::new(), Vec::new()));
                }
                if !line.is_empty() {
                    children.push(Node::text(line));
                }
            }
            schema.node("paragraph", Attrs::new(), children)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ingest_text, plain_paragraphs, PasteKind};
    use crate::extension::kernel::{EditorExtension, ExtensionRegistry};
    use crate::extension::schema::Schema;
    use crate::extension::spec::{NodeSpec, GROUP_BLOCK, GROUP_INLINE};
    use crate::render::DomSpec;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        ExtensionRegistry::with_builtins()
            .expect("builtins")
            .build()
            .expect("schema")
            .schema
    }

    #[test]
    fn plain_text_splits_on_blank_lines() {
        let schema = schema();
        let nodes = plain_paragraphs(&schema, "first line\nsecond line\n\n  \nthird").expect("plain");
        assert_eq!(nodes.len(), 2);
        let first: Vec<_> = nodes[0]
            .children()
            .iter()
            .map(|child| child.type_name.as_str())
            .collect();
        assert_eq!(first, vec!["text", "hard_break", "text"]);
        assert_eq!(nodes[1].text_content(), "third");
    }

    #[test]
    fn markdown_toggle_forces_plain_text() {
        let schema = schema();
        let ingested = ingest_text(&schema, "# Title", false).expect("ingest");
        assert_eq!(ingested.kind, PasteKind::PlainText);
        assert_eq!(ingested.nodes[0].type_name, "paragraph");
        assert_eq!(ingested.nodes[0].text_content(), "# Title");

        let ingested = ingest_text(&schema, "# Title", true).expect("ingest");
        assert_eq!(ingested.kind, PasteKind::Markdown);
        assert_eq!(ingested.nodes[0].type_name, "heading");
    }

    struct ParagraphsOnly;

    impl EditorExtension for ParagraphsOnly {
        fn id(&self) -> &str {
            "test.paragraphs"
        }

        fn nodes(&self) -> Vec<NodeSpec> {
            vec![
                NodeSpec::new("doc", |_| DomSpec::new("div")).content("block+"),
                NodeSpec::new("text", |_| DomSpec::new("span"))
                    .group(GROUP_INLINE)
                    .text_leaf(),
                NodeSpec::block("paragraph", |_| DomSpec::new("p"))
                    .group(GROUP_BLOCK)
                    .content("inline*"),
            ]
        }
    }

    #[test]
    fn unsupported_markdown_falls_back_to_one_paragraph() {
        let mut registry = ExtensionRegistry::new();
        registry.register(&ParagraphsOnly).expect("registration");
        let schema = registry.build().expect("schema").schema;

        let ingested = ingest_text(&schema, "# Title\n\nbody", true).expect("ingest");
        assert_eq!(ingested.kind, PasteKind::Fallback);
        assert_eq!(ingested.nodes.len(), 1);
        assert_eq!(ingested.nodes[0].text_content(), "# Title\n\nbody");
    }
}
