//! Live document outline.
//!
//! # Responsibility
//! - Collect headings in document order and nest them by level.
//! - Give every heading a stable anchor id and persist newly derived ids.
//!
//! # Invariants
//! - An existing heading `id` is never rewritten.
//! - Derived ids only depend on level, text and heading position, so
//!   repeated extraction of the same document yields the same ids.
//! - Id writes are folded into the newest undo entry.

use crate::extension::schema::{int_attr, Schema};
use crate::model::node::{AttrValue, Attrs, Node};
use crate::model::path::Path;
use crate::serialize::{deserialize, SerializeError};
use crate::transform::transaction::{HistoryMode, Transaction};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default cap for the slug part of derived heading ids.
pub const DEFAULT_SLUG_MAX_CHARS: usize = 50;

const HEADING_TYPE: &str = "heading";
const HEADING_ID_ATTR: &str = "id";

static NON_SLUG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9_\s\x{4e00}-\x{9fa5}-]").expect("valid slug filter regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// One outline entry with its nested sub-headings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineItem {
    pub id: String,
    pub level: u8,
    pub text: String,
    pub children: Vec<OutlineItem>,
}

/// Extraction result.
#[derive(Debug, Clone)]
pub struct Outline {
    /// Heading forest in document order.
    pub items: Vec<OutlineItem>,
    /// `setAttrs` steps persisting ids derived in this pass; empty when every
    /// heading already carried one.
    pub assignments: Transaction,
}

/// Heading walker configured with the slug length cap.
#[derive(Debug, Clone, Copy)]
pub struct OutlineExtractor {
    slug_max_chars: usize,
}

impl Default for OutlineExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SLUG_MAX_CHARS)
    }
}

impl OutlineExtractor {
    pub fn new(slug_max_chars: usize) -> Self {
        Self {
            slug_max_chars: slug_max_chars.max(1),
        }
    }

    pub fn extract(&self, doc: &Node) -> Outline {
        let mut flat = Vec::new();
        let mut assignments = Transaction::new()
            .with_origin("outline")
            .with_history(HistoryMode::AppendToLast);

        for (index, (path, heading)) in collect_headings(doc).into_iter().enumerate() {
            let level = int_attr(heading, "level", 1).clamp(1, 6) as u8;
            let text = heading.text_content();
            let id = match existing_id(heading) {
                Some(id) => id.to_string(),
                None => {
                    let id = heading_id(level, text.as_str(), index, self.slug_max_chars);
                    let mut attrs = Attrs::new();
                    attrs.insert(HEADING_ID_ATTR.to_string(), AttrValue::from(id.as_str()));
                    assignments = assignments.set_attrs(path, attrs);
                    id
                }
            };
            flat.push(OutlineItem {
                id,
                level,
                text,
                children: Vec::new(),
            });
        }

        Outline {
            items: nest(flat),
            assignments,
        }
    }

    /// Extracts the outline of serialized markup.
    ///
    /// Nothing is persisted; ids missing from the markup are derived on the
    /// fly.
    pub fn extract_from_markup(
        &self,
        schema: &Schema,
        markup: &str,
    ) -> Result<Vec<OutlineItem>, SerializeError> {
        let doc = deserialize(schema, markup)?;
        Ok(self.extract(doc.root()).items)
    }
}

/// Anchor slug: lowercase, punctuation stripped (CJK ideographs kept),
/// whitespace runs collapsed to `-`, capped at `max_chars` characters.
pub fn slugify(text: &str, max_chars: usize) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_SLUG_RE.replace_all(lowered.as_str(), "");
    let collapsed = WHITESPACE_RE.replace_all(stripped.trim(), "-");
    collapsed.chars().take(max_chars).collect()
}

/// Derived id `heading-{level}-{slug}-{index}`, or `heading-{level}-{index}`
/// when the slug is empty.
pub fn heading_id(level: u8, text: &str, index: usize, slug_max_chars: usize) -> String {
    let slug = slugify(text, slug_max_chars);
    if slug.is_empty() {
        format!("heading-{level}-{index}")
    } else {
        format!("heading-{level}-{slug}-{index}")
    }
}

fn existing_id(heading: &Node) -> Option<&str> {
    heading
        .attr(HEADING_ID_ATTR)
        .and_then(AttrValue::as_str)
        .filter(|id| !id.trim().is_empty())
}

fn collect_headings(doc: &Node) -> Vec<(Path, &Node)> {
    let mut paths = Vec::new();
    doc.walk(&mut |path, node| {
        if node.type_name == HEADING_TYPE {
            paths.push(path.clone());
            return false;
        }
        !node.is_text()
    });
    paths
        .into_iter()
        .filter_map(|path| doc.node_at(&path).map(|node| (path, node)))
        .collect()
}

/// Nests a flat heading list: each heading becomes a child of the closest
/// preceding heading with a smaller level.
fn nest(flat: Vec<OutlineItem>) -> Vec<OutlineItem> {
    let mut roots = Vec::new();
    let mut open: Vec<OutlineItem> = Vec::new();
    for item in flat {
        while open.last().is_some_and(|top| top.level >= item.level) {
            if let Some(done) = open.pop() {
                attach(done, &mut open, &mut roots);
            }
        }
        open.push(item);
    }
    while let Some(done) = open.pop() {
        attach(done, &mut open, &mut roots);
    }
    roots
}

fn attach(item: OutlineItem, open: &mut [OutlineItem], roots: &mut Vec<OutlineItem>) {
    match open.last_mut() {
        Some(parent) => parent.children.push(item),
        None => roots.push(item),
    }
}

#[cfg(test)]
mod tests {
    use super::{heading_id, nest, slugify, OutlineItem};

    fn item(level: u8, text: &str) -> OutlineItem {
        OutlineItem {
            id: text.to_string(),
            level,
            text: text.to_string(),
            children: Vec::new(),
        }
    }

    #[test]
    fn slug_keeps_cjk_and_collapses_whitespace() {
        assert_eq!(slugify("Hello, World!", 50), "hello-world");
        assert_eq!(slugify("  快速 开始  Guide ", 50), "快速-开始-guide");
        assert_eq!(slugify("snake_case and-dash", 50), "snake_case-and-dash");
        assert_eq!(slugify("abcdef", 3), "abc");
        assert_eq!(slugify("!!!", 50), "");
    }

    #[test]
    fn heading_id_falls_back_without_slug() {
        assert_eq!(heading_id(2, "Setup", 2, 50), "heading-2-setup-2");
        assert_eq!(heading_id(1, "???", 0, 50), "heading-1-0");
    }

    #[test]
    fn nest_builds_forest_by_level() {
        let forest = nest(vec![
            item(2, "a"),
            item(3, "a.1"),
            item(3, "a.2"),
            item(1, "b"),
            item(3, "b.1"),
            item(2, "b.2"),
        ]);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].text, "a");
        assert_eq!(forest[0].children.len(), 2);
        assert_eq!(forest[1].children.len(), 2);
        assert_eq!(forest[1].children[0].text, "b.1");
        assert_eq!(forest[1].children[1].text, "b.2");
    }
}
