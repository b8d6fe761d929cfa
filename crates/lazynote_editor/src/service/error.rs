//! Facade error for editor use-cases.

use crate::config::ConfigError;
use crate::extension::kernel::RegistryError;
use crate::extension::schema::SchemaError;
use crate::markdown::MarkdownError;
use crate::reorder::ReorderError;
use crate::serialize::SerializeError;
use crate::suggest::SuggestError;
use crate::transform::step::StepError;
use crate::transform::transaction::TransactionError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors surfaced by [`crate::Editor`] and [`crate::EditorSession`].
///
/// Every error is local: the current document is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// The resulting document would violate the schema.
    SchemaViolation(SchemaError),
    /// Step `index` of the transaction has malformed parameters.
    InvalidStep { index: usize, source: StepError },
    /// A block cannot be moved into its own subtree.
    CyclicMove { source_id: String, target_id: String },
    BlockNotFound(String),
    /// Markdown conversion failed. Paste recovers from this on its own.
    ParseFailure(MarkdownError),
    Suggest(SuggestError),
    Serialize(SerializeError),
    Registry(RegistryError),
    Config(ConfigError),
}

impl EditorError {
    /// Stable kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaViolation(_) => "schema_violation",
            Self::InvalidStep { .. } => "invalid_step",
            Self::CyclicMove { .. } => "cyclic_move",
            Self::BlockNotFound(_) => "block_not_found",
            Self::ParseFailure(_) => "parse_failure",
            Self::Suggest(_) => "suggest",
            Self::Serialize(_) => "serialize",
            Self::Registry(_) => "registry",
            Self::Config(_) => "config",
        }
    }
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SchemaViolation(err) => write!(f, "schema violation: {err}"),
            Self::InvalidStep { index, source } => write!(f, "invalid step {index}: {source}"),
            Self::CyclicMove {
                source_id,
                target_id,
            } => write!(
                f,
                "cannot move block {source_id} next to its own descendant {target_id}"
            ),
            Self::BlockNotFound(id) => write!(f, "block not found: {id}"),
            Self::ParseFailure(err) => write!(f, "markdown parse failure: {err}"),
            Self::Suggest(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SchemaViolation(err) => Some(err),
            Self::InvalidStep { source, .. } => Some(source),
            Self::CyclicMove { .. } | Self::BlockNotFound(_) => None,
            Self::ParseFailure(err) => Some(err),
            Self::Suggest(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<SchemaError> for EditorError {
    fn from(value: SchemaError) -> Self {
        Self::SchemaViolation(value)
    }
}

impl From<TransactionError> for EditorError {
    fn from(value: TransactionError) -> Self {
        match value {
            TransactionError::Step { index, source } => Self::InvalidStep { index, source },
            TransactionError::Schema(err) => Self::SchemaViolation(err),
        }
    }
}

impl From<ReorderError> for EditorError {
    fn from(value: ReorderError) -> Self {
        match value {
            ReorderError::BlockNotFound(id) => Self::BlockNotFound(id),
            ReorderError::CyclicMove {
                source_id,
                target_id,
            } => Self::CyclicMove {
                source_id,
                target_id,
            },
        }
    }
}

impl From<MarkdownError> for EditorError {
    fn from(value: MarkdownError) -> Self {
        Self::ParseFailure(value)
    }
}

impl From<SuggestError> for EditorError {
    fn from(value: SuggestError) -> Self {
        Self::Suggest(value)
    }
}

impl From<SerializeError> for EditorError {
    fn from(value: SerializeError) -> Self {
        Self::Serialize(value)
    }
}

impl From<RegistryError> for EditorError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<ConfigError> for EditorError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
