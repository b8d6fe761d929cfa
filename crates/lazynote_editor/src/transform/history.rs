//! Linear undo/redo history.
//!
//! # Invariants
//! - Entries store the steps as applied plus their inverse, captured at
//!   commit time; nothing is re-derived on undo.
//! - Recording a new entry clears the redo stack.
//! - The undo stack never exceeds `limit`; the oldest entries drop first.

use crate::transform::step::Step;
use std::collections::VecDeque;

/// One committed transaction as remembered by history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub steps: Vec<Step>,
    /// Steps that revert `steps`, in application order.
    pub inverse: Vec<Step>,
    pub origin: &'static str,
}

#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Records a fresh user-visible change.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.redo.clear();
        self.push_undo(entry);
    }

    /// Folds derived steps into the newest undo entry.
    ///
    /// Returns `false` when there is no entry to extend.
    pub fn append_to_last(&mut self, steps: Vec<Step>, mut inverse: Vec<Step>) -> bool {
        let Some(last) = self.undo.back_mut() else {
            return false;
        };
        last.steps.extend(steps);
        inverse.append(&mut last.inverse);
        last.inverse = inverse;
        true
    }

    /// Pushes an entry onto the undo stack without touching redo.
    pub fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo.push_back(entry);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo.pop_back()
    }

    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo.push(entry);
    }

    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo.pop()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
