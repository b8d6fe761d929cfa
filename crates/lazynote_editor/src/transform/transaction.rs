//! Transactions: ordered step lists applied all-or-nothing.

use crate::extension::schema::{Schema, SchemaError};
use crate::model::node::{Attrs, Node};
use crate::model::path::{Path, Range};
use crate::transform::step::{Step, StepError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How a committed transaction interacts with undo history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryMode {
    /// Push a new undo entry and clear redo.
    #[default]
    Record,
    /// Fold into the most recent undo entry; skipped when history is empty.
    AppendToLast,
    /// Leave history untouched.
    Skip,
}

/// Ordered list of steps built incrementally and committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    steps: Vec<Step>,
    history: HistoryMode,
    origin: &'static str,
}

/// Result of folding a transaction over a base document.
#[derive(Debug, Clone)]
pub struct Composed {
    pub doc: Node,
    /// Inverse steps in application order (already reversed).
    pub inverse: Vec<Step>,
}

/// Transaction-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// Step `index` could not be applied.
    Step { index: usize, source: StepError },
    /// The composed document does not satisfy the schema.
    Schema(SchemaError),
}

impl Display for TransactionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step { index, source } => write!(f, "step {index} failed: {source}"),
            Self::Schema(err) => write!(f, "schema violation: {err}"),
        }
    }
}

impl Error for TransactionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Step { source, .. } => Some(source),
            Self::Schema(err) => Some(err),
        }
    }
}

impl From<SchemaError> for TransactionError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            origin: "edit",
            ..Self::default()
        }
    }

    /// Labels the transaction for logs (`paste`, `slash`, `reorder`, ...).
    pub fn with_origin(mut self, origin: &'static str) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_history(mut self, history: HistoryMode) -> Self {
        self.history = history;
        self
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::new()
        }
    }

    pub fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn insert(mut self, at: Path, nodes: Vec<Node>) -> Self {
        self.steps.push(Step::insert(at, nodes));
        self
    }

    pub fn delete(mut self, range: Range) -> Self {
        self.steps.push(Step::delete(range));
        self
    }

    pub fn set_attrs(mut self, path: Path, attrs: Attrs) -> Self {
        self.steps.push(Step::set_attrs(path, attrs));
        self
    }

    pub fn replace_range(mut self, range: Range, fragment: Vec<Node>) -> Self {
        self.steps.push(Step::replace_range(range, fragment));
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn history(&self) -> HistoryMode {
        self.history
    }

    pub fn origin(&self) -> &'static str {
        self.origin
    }

    /// Folds every step over `base` without validating content expressions.
    ///
    /// The first failing step aborts the fold; `base` is never touched.
    pub fn compose(&self, schema: &Schema, base: &Node) -> Result<Composed, TransactionError> {
        let mut doc = base.clone();
        let mut inverse = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let (next, undo) = step
                .apply(schema, &doc)
                .map_err(|source| TransactionError::Step { index, source })?;
            doc = next;
            inverse.push(undo);
        }
        inverse.reverse();
        Ok(Composed { doc, inverse })
    }
}
