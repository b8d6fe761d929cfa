//! Editing core for LazyNote block documents.
//!
//! The crate owns the document model, the transaction engine with undo/redo,
//! the extension registry that builds the schema, and the services layered on
//! top: outline extraction, markdown paste, slash suggestions, block reorder
//! and markup persistence. Hosts drive everything through [`EditorSession`].

pub mod config;
pub mod extension;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod outline;
pub mod render;
pub mod reorder;
pub mod serialize;
pub mod service;
pub mod suggest;
pub mod transform;

pub use config::{ConfigError, EditorConfig};
pub use extension::kernel::{EditorExtension, EditorKit, ExtensionRegistry, RegistryError};
pub use extension::schema::{Schema, SchemaError};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LevelSource,
    LoggingStatus,
};
pub use markdown::{ingest_text, Ingested, MarkdownError, PasteKind};
pub use model::document::Document;
pub use model::node::{AttrValue, Attrs, Mark, Node, NodeContent};
pub use model::path::{Path, Range};
pub use outline::{Outline, OutlineExtractor, OutlineItem};
pub use reorder::{Placement, ReorderError, ReorderSession};
pub use serialize::{deserialize, serialize, SerializeError};
pub use service::editor::{DocumentObserver, Editor};
pub use service::error::EditorError;
pub use service::session::{DocumentSink, EditorSession, OutlineObserver, TickOutcome};
pub use suggest::{SlashKey, SlashOutcome, SlashSession, SlashTrigger, Suggestion, SuggestionCatalog};
pub use transform::step::{Step, StepError};
pub use transform::transaction::{HistoryMode, Transaction, TransactionError};

/// Returns the editor crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
