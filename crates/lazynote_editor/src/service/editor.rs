//! Document engine: current version, commits and history.
//!
//! # Responsibility
//! - Own the current document version and its undo/redo history.
//! - Commit transactions through one validate-then-swap path.
//! - Merge adjacent text leaves, assign missing block ids and notify
//!   document observers.
//!
//! # Invariants
//! - The current document always validates against the schema.
//! - No container in a committed document holds two adjacent text leaves
//!   with equal marks.
//! - A failed commit leaves the current document pointer untouched.
//! - Undo and redo go through the same commit path as edits.
//! - Document text is never logged.

use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::extension::kernel::{EditorKit, ExtensionRegistry};
use crate::extension::schema::{Schema, TOP_NODE};
use crate::model::document::Document;
use crate::model::node::{AttrValue, Attrs, Node, NodeContent, BLOCK_ID_ATTR};
use crate::model::path::{Path, Range};
use crate::service::error::EditorError;
use crate::suggest::SuggestionCatalog;
use crate::transform::history::{History, HistoryEntry};
use crate::transform::step::Step;
use crate::transform::transaction::{Composed, HistoryMode, Transaction};
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

/// Receives every committed document version (edits, undo and redo).
pub trait DocumentObserver {
    fn document_changed(&mut self, doc: &Document, version: u64);
}

impl<F> DocumentObserver for F
where
    F: FnMut(&Document, u64),
{
    fn document_changed(&mut self, doc: &Document, version: u64) {
        self(doc, version)
    }
}

/// Single-document editing engine.
pub struct Editor {
    schema: Arc<Schema>,
    catalog: Arc<SuggestionCatalog>,
    doc: Document,
    version: u64,
    history: History,
    observers: Vec<Box<dyn DocumentObserver>>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("version", &self.version)
            .field("undo_depth", &self.history.undo_depth())
            .field("redo_depth", &self.history.redo_depth())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Editor {
    /// Adopts `doc` as the initial version.
    ///
    /// The document is normalized, missing block ids are assigned (outside
    /// history) and the result is validated.
    pub fn new(kit: EditorKit, doc: Node, history_limit: usize) -> Result<Self, EditorError> {
        let schema = kit.schema;
        let mut root = schema.normalize(doc)?;
        for step in block_id_steps(&schema, &root) {
            root = step
                .apply(&schema, &root)
                .map_err(|source| EditorError::InvalidStep { index: 0, source })?
                .0;
        }
        schema.validate(&root)?;
        info!(
            "event=editor_open module=editor status=ok nodes={} history_limit={}",
            root.node_count(),
            history_limit
        );
        Ok(Self {
            schema,
            catalog: kit.catalog,
            doc: Document::new(root),
            version: 0,
            history: History::new(history_limit),
            observers: Vec::new(),
        })
    }

    /// Editor with the built-in extensions and one empty paragraph.
    pub fn with_builtins() -> Result<Self, EditorError> {
        let kit = ExtensionRegistry::with_builtins()?.build()?;
        let doc = empty_document(&kit.schema)?;
        Self::new(kit, doc, DEFAULT_HISTORY_LIMIT)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn catalog(&self) -> &Arc<SuggestionCatalog> {
        &self.catalog
    }

    /// Current version; cheap to clone.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Number of successful commits (undo and redo included).
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn can_undo(&self) -> bool {
        self.history.undo_depth() > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history.redo_depth() > 0
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    pub fn subscribe(&mut self, observer: Box<dyn DocumentObserver>) {
        self.observers.push(observer);
    }

    /// Folds `tx` over the current document without committing.
    pub fn compose(&self, tx: &Transaction) -> Result<Composed, EditorError> {
        Ok(tx.compose(&self.schema, self.doc.root())?)
    }

    /// Applies `tx` atomically.
    ///
    /// Blocks still lacking an id receive one through `setAttrs` steps
    /// appended to the transaction. Returns the version after the commit;
    /// an empty transaction is a no-op.
    pub fn commit(&mut self, tx: Transaction) -> Result<u64, EditorError> {
        if tx.is_empty() {
            return Ok(self.version);
        }
        let origin = tx.origin();
        let history_mode = tx.history();
        let result = self.prepare(&tx);
        let (doc, steps, inverse) = match result {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(
                    "event=tx_commit module=editor status=error origin={} steps={} error_kind={}",
                    origin,
                    tx.len(),
                    err.kind()
                );
                return Err(err);
            }
        };

        let step_count = steps.len();
        match history_mode {
            HistoryMode::Record => self.history.record(HistoryEntry {
                steps,
                inverse,
                origin,
            }),
            HistoryMode::AppendToLast => {
                if !self.history.append_to_last(steps, inverse) {
                    debug!(
                        "event=history_append module=editor status=skipped origin={}",
                        origin
                    );
                }
            }
            HistoryMode::Skip => {}
        }
        self.install(doc);
        info!(
            "event=tx_commit module=editor status=ok origin={} steps={} version={}",
            origin, step_count, self.version
        );
        Ok(self.version)
    }

    /// Reverts the newest history entry. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let Some(entry) = self.history.pop_undo() else {
            return Ok(false);
        };
        match self.replay(&entry.inverse) {
            Ok(doc) => {
                self.history.push_redo(entry);
                self.install(doc);
                info!(
                    "event=undo module=editor status=ok version={}",
                    self.version
                );
                Ok(true)
            }
            Err(err) => {
                warn!(
                    "event=undo module=editor status=error error_kind={}",
                    err.kind()
                );
                self.history.push_undo(entry);
                Err(err)
            }
        }
    }

    /// Re-applies the newest undone entry. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let Some(entry) = self.history.pop_redo() else {
            return Ok(false);
        };
        match self.replay(&entry.steps) {
            Ok(doc) => {
                self.history.push_undo(entry);
                self.install(doc);
                info!(
                    "event=redo module=editor status=ok version={}",
                    self.version
                );
                Ok(true)
            }
            Err(err) => {
                warn!(
                    "event=redo module=editor status=error error_kind={}",
                    err.kind()
                );
                self.history.push_redo(entry);
                Err(err)
            }
        }
    }

    /// Drops all undo/redo entries.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn prepare(&self, tx: &Transaction) -> Result<(Node, Vec<Step>, Vec<Step>), EditorError> {
        let Composed { mut doc, mut inverse } = self.compose(tx)?;
        let mut steps = tx.steps().to_vec();
        let merges = text_merge_steps(&doc);
        doc = self.append_derived(doc, merges, &mut steps, &mut inverse)?;
        let ids = block_id_steps(&self.schema, &doc);
        doc = self.append_derived(doc, ids, &mut steps, &mut inverse)?;
        self.schema.validate(&doc)?;
        Ok((doc, steps, inverse))
    }

    /// Applies steps derived from the composed document so they share the
    /// committing history entry.
    fn append_derived(
        &self,
        mut doc: Node,
        derived: Vec<Step>,
        steps: &mut Vec<Step>,
        inverse: &mut Vec<Step>,
    ) -> Result<Node, EditorError> {
        for step in derived {
            let index = steps.len();
            let (next, undo) = step
                .apply(&self.schema, &doc)
                .map_err(|source| EditorError::InvalidStep { index, source })?;
            doc = next;
            inverse.insert(0, undo);
            steps.push(step);
        }
        Ok(doc)
    }

    fn replay(&self, steps: &[Step]) -> Result<Node, EditorError> {
        let tx = Transaction::from_steps(steps.to_vec());
        let Composed { doc, .. } = self.compose(&tx)?;
        self.schema.validate(&doc)?;
        Ok(doc)
    }

    fn install(&mut self, doc: Node) {
        self.doc = Document::new(doc);
        self.version += 1;
        for observer in &mut self.observers {
            observer.document_changed(&self.doc, self.version);
        }
    }
}

/// Document holding a single empty paragraph.
pub fn empty_document(schema: &Schema) -> Result<Node, EditorError> {
    let paragraph = schema.node("paragraph", Attrs::new(), Vec::new())?;
    Ok(schema.node(TOP_NODE, Attrs::new(), vec![paragraph])?)
}

/// `replaceRange` steps folding each run of adjacent equal-mark text leaves
/// into one leaf.
///
/// Steps come last-to-first so earlier paths stay valid while applying.
fn text_merge_steps(doc: &Node) -> Vec<Step> {
    let mut steps = Vec::new();
    doc.walk(&mut |path, node| {
        if node.is_text() {
            return false;
        }
        let children = node.children();
        let mut start = 0;
        while start < children.len() {
            let mut end = start + 1;
            while end < children.len() && mergeable(&children[end - 1], &children[end]) {
                end += 1;
            }
            if end - start > 1 {
                let mut merged = children[start].clone();
                merged.content = NodeContent::Text(
                    children[start..end]
                        .iter()
                        .filter_map(Node::text_value)
                        .collect(),
                );
                steps.push(Step::replace_range(
                    Range::new(path.clone(), start, end),
                    vec![merged],
                ));
            }
            start = end;
        }
        true
    });
    steps.reverse();
    steps
}

fn mergeable(left: &Node, right: &Node) -> bool {
    left.is_text() && right.is_text() && left.marks == right.marks
}

/// `setAttrs` steps giving a fresh id to every block that lacks one.
fn block_id_steps(schema: &Schema, doc: &Node) -> Vec<Step> {
    let mut missing: Vec<Path> = Vec::new();
    doc.walk(&mut |path, node| {
        if node.is_text() {
            return false;
        }
        if schema.has_block_id(node.type_name.as_str()) && node.block_id().is_none() {
            missing.push(path.clone());
        }
        true
    });
    missing
        .into_iter()
        .map(|path| {
            let mut attrs = Attrs::new();
            attrs.insert(
                BLOCK_ID_ATTR.to_string(),
                AttrValue::from(Uuid::new_v4().to_string()),
            );
            Step::set_attrs(path, attrs)
        })
        .collect()
}
