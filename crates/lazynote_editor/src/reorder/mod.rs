//! Drag-and-drop block reordering.
//!
//! # Responsibility
//! - Resolve a dragged block and a drop target by `blockId`.
//! - Build the `delete` + `insert` transaction that moves the subtree.
//!
//! # Invariants
//! - Dropping a block onto itself produces an empty transaction.
//! - Dropping a block into its own subtree is rejected before any
//!   transaction is built.
//! - The moved subtree keeps its attributes, `blockId` included.

use crate::model::node::Node;
use crate::model::path::{Path, Range};
use crate::transform::transaction::Transaction;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Drop position relative to the target block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// Reorder failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    BlockNotFound(String),
    /// The target lives inside the dragged subtree.
    CyclicMove { source_id: String, target_id: String },
}

impl Display for ReorderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlockNotFound(id) => write!(f, "block not found: {id}"),
            Self::CyclicMove {
                source_id,
                target_id,
            } => write!(
                f,
                "cannot move block {source_id} next to its own descendant {target_id}"
            ),
        }
    }
}

impl Error for ReorderError {}

/// One drag gesture, started on a source block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderSession {
    source_id: String,
    source_path: Path,
    source: Node,
}

impl ReorderSession {
    /// Starts dragging the block carrying `source_id`.
    pub fn start(doc: &Node, source_id: &str) -> Result<Self, ReorderError> {
        let source_path = resolve(doc, source_id)?;
        let source = doc
            .node_at(&source_path)
            .cloned()
            .ok_or_else(|| ReorderError::BlockNotFound(source_id.to_string()))?;
        Ok(Self {
            source_id: source_id.to_string(),
            source_path,
            source,
        })
    }

    pub fn source_id(&self) -> &str {
        self.source_id.as_str()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Subtree captured when the drag started.
    pub fn source(&self) -> &Node {
        &self.source
    }

    /// Builds the move transaction for dropping on `target_id`.
    ///
    /// Paths are re-resolved against `doc`, so the session stays usable when
    /// unrelated edits landed while dragging.
    pub fn drop_on(
        &self,
        doc: &Node,
        target_id: &str,
        placement: Placement,
    ) -> Result<Transaction, ReorderError> {
        let tx = Transaction::new().with_origin("reorder");
        if target_id == self.source_id {
            return Ok(tx);
        }

        let source_path = resolve(doc, self.source_id.as_str())?;
        let target_path = resolve(doc, target_id)?;
        if target_path.is_descendant_of(&source_path) {
            return Err(ReorderError::CyclicMove {
                source_id: self.source_id.clone(),
                target_id: target_id.to_string(),
            });
        }
        let source = doc
            .node_at(&source_path)
            .cloned()
            .ok_or_else(|| ReorderError::BlockNotFound(self.source_id.clone()))?;
        let range = Range::single(&source_path)
            .ok_or_else(|| ReorderError::BlockNotFound(self.source_id.clone()))?;

        let insert_at = insertion_path(&source_path, &target_path, placement);
        debug!(
            "event=reorder_plan module=reorder status=ok from={} to={}",
            source_path, insert_at
        );
        Ok(tx.delete(range).insert(insert_at, vec![source]))
    }
}

fn resolve(doc: &Node, block_id: &str) -> Result<Path, ReorderError> {
    doc.find_block(block_id)
        .filter(|path| !path.is_root())
        .ok_or_else(|| ReorderError::BlockNotFound(block_id.to_string()))
}

/// Insertion point for the source, expressed in the tree after the source
/// has been removed.
fn insertion_path(source: &Path, target: &Path, placement: Placement) -> Path {
    let mut indices = target.indices().to_vec();
    if let Some(last) = indices.last_mut() {
        if placement == Placement::After {
            *last += 1;
        }
    }

    // Removing the source shifts later siblings (and their subtrees) left.
    if let Some((source_parent, source_index)) = source.split_last() {
        let level = source_parent.depth();
        if indices.len() > level
            && indices[..level] == *source_parent.indices()
            && indices[level] > source_index
        {
            indices[level] -= 1;
        }
    }
    Path::from(indices)
}

#[cfg(test)]
mod tests {
    use super::{insertion_path, Placement};
    use crate::model::path::Path;

    #[test]
    fn same_parent_forward_move_is_decremented() {
        let source = Path::from(vec![1]);
        let target = Path::from(vec![2]);
        assert_eq!(
            insertion_path(&source, &target, Placement::After),
            Path::from(vec![2])
        );
        assert_eq!(
            insertion_path(&source, &target, Placement::Before),
            Path::from(vec![1])
        );
    }

    #[test]
    fn backward_move_keeps_target_index() {
        let source = Path::from(vec![3]);
        let target = Path::from(vec![0]);
        assert_eq!(
            insertion_path(&source, &target, Placement::Before),
            Path::from(vec![0])
        );
    }

    #[test]
    fn removal_shifts_target_ancestor() {
        let source = Path::from(vec![0]);
        let target = Path::from(vec![2, 1]);
        assert_eq!(
            insertion_path(&source, &target, Placement::After),
            Path::from(vec![1, 2])
        );
    }
}
