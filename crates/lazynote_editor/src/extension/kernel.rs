//! Extension kernel: registration of node/mark types and slash commands.
//!
//! # Responsibility
//! - Accept declarations from extensions and reject conflicting ones.
//! - Freeze declarations into a [`Schema`] plus a slash-command catalog.
//!
//! # Invariants
//! - Extension ids are unique lowercase dotted identifiers.
//! - A node or mark type name is owned by exactly one extension.
//! - Registration order is preserved: it decides parse-rule priority and
//!   catalog order.

use crate::extension::schema::Schema;
use crate::extension::spec::{MarkSpec, NodeSpec};
use crate::suggest::{Suggestion, SuggestionCatalog};
use log::{debug, info};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Contract implemented by every editor plugin.
///
/// Extensions are declaration-only: they hand over specs and command
/// entries, the kernel owns the resulting schema.
pub trait EditorExtension {
    /// Stable extension identifier, e.g. `builtin.heading`.
    fn id(&self) -> &str;

    fn nodes(&self) -> Vec<NodeSpec> {
        Vec::new()
    }

    fn marks(&self) -> Vec<MarkSpec> {
        Vec::new()
    }

    /// Slash-menu entries contributed by this extension.
    fn commands(&self) -> Vec<Suggestion> {
        Vec::new()
    }
}

/// Registration snapshot for one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredExtension {
    pub id: String,
    pub node_types: Vec<String>,
    pub mark_types: Vec<String>,
    pub command_count: usize,
}

/// Output of [`ExtensionRegistry::build`].
#[derive(Debug, Clone)]
pub struct EditorKit {
    pub schema: Arc<Schema>,
    pub catalog: Arc<SuggestionCatalog>,
}

/// In-process registry collecting extension declarations.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    entries: BTreeMap<String, RegisteredExtension>,
    type_owner: BTreeMap<String, String>,
    mark_owner: BTreeMap<String, String>,
    nodes: Vec<NodeSpec>,
    marks: Vec<MarkSpec>,
    commands: Vec<Suggestion>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with every built-in extension.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for extension in crate::extension::builtin::builtin_extensions() {
            registry.register(extension.as_ref())?;
        }
        Ok(registry)
    }

    /// Registers one extension after declaration validation.
    pub fn register(&mut self, extension: &dyn EditorExtension) -> Result<(), RegistryError> {
        let id = extension.id().trim().to_string();
        if !is_valid_extension_id(id.as_str()) {
            return Err(RegistryError::InvalidExtensionId(id));
        }
        if self.entries.contains_key(id.as_str()) {
            return Err(RegistryError::DuplicateExtensionId(id));
        }

        let nodes = extension.nodes();
        let marks = extension.marks();
        let commands = extension.commands();

        for spec in &nodes {
            if !is_valid_type_name(spec.name.as_str()) {
                return Err(RegistryError::InvalidTypeName(spec.name.clone()));
            }
            if let Some(owner) = self.type_owner.get(spec.name.as_str()) {
                return Err(RegistryError::DuplicateNodeType {
                    type_name: spec.name.clone(),
                    owner: owner.clone(),
                });
            }
        }
        for spec in &marks {
            if !is_valid_type_name(spec.name.as_str()) {
                return Err(RegistryError::InvalidTypeName(spec.name.clone()));
            }
            if let Some(owner) = self.mark_owner.get(spec.name.as_str()) {
                return Err(RegistryError::DuplicateMarkType {
                    type_name: spec.name.clone(),
                    owner: owner.clone(),
                });
            }
        }

        let entry = RegisteredExtension {
            id: id.clone(),
            node_types: nodes.iter().map(|spec| spec.name.clone()).collect(),
            mark_types: marks.iter().map(|spec| spec.name.clone()).collect(),
            command_count: commands.len(),
        };
        for name in &entry.node_types {
            self.type_owner.insert(name.clone(), id.clone());
        }
        for name in &entry.mark_types {
            self.mark_owner.insert(name.clone(), id.clone());
        }

        debug!(
            "event=extension_register module=extension status=ok id={} nodes={} marks={} commands={}",
            id,
            entry.node_types.len(),
            entry.mark_types.len(),
            entry.command_count
        );

        self.nodes.extend(nodes);
        self.marks.extend(marks);
        self.commands.extend(commands);
        self.entries.insert(id, entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, extension_id: &str) -> Option<&RegisteredExtension> {
        self.entries.get(extension_id)
    }

    /// Returns the id of the extension that declared `type_name`.
    pub fn owner_of(&self, type_name: &str) -> Option<&str> {
        self.type_owner
            .get(type_name)
            .or_else(|| self.mark_owner.get(type_name))
            .map(String::as_str)
    }

    /// Freezes declarations into a schema and command catalog.
    pub fn build(self) -> Result<EditorKit, RegistryError> {
        let extension_count = self.entries.len();
        let schema = Schema::compile(self.nodes, self.marks)?;
        let catalog = SuggestionCatalog::new(self.commands);
        info!(
            "event=schema_build module=extension status=ok extensions={} commands={}",
            extension_count,
            catalog.len()
        );
        Ok(EditorKit {
            schema: Arc::new(schema),
            catalog: Arc::new(catalog),
        })
    }
}

/// Registry declaration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidExtensionId(String),
    DuplicateExtensionId(String),
    InvalidTypeName(String),
    DuplicateNodeType { type_name: String, owner: String },
    DuplicateMarkType { type_name: String, owner: String },
    InvalidContentExpr { type_name: String, message: String },
    UnresolvedContentName { type_name: String, name: String },
    MissingNodeType(&'static str),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidExtensionId(value) => write!(f, "extension id is invalid: {value}"),
            Self::DuplicateExtensionId(value) => {
                write!(f, "extension id already registered: {value}")
            }
            Self::InvalidTypeName(value) => write!(f, "type name is invalid: {value}"),
            Self::DuplicateNodeType { type_name, owner } => {
                write!(f, "node type `{type_name}` already registered by {owner}")
            }
            Self::DuplicateMarkType { type_name, owner } => {
                write!(f, "mark type `{type_name}` already registered by {owner}")
            }
            Self::InvalidContentExpr { type_name, message } => {
                write!(f, "invalid content expression for `{type_name}`: {message}")
            }
            Self::UnresolvedContentName { type_name, name } => write!(
                f,
                "content expression of `{type_name}` references unknown name `{name}`"
            ),
            Self::MissingNodeType(name) => write!(f, "schema requires node type `{name}`"),
        }
    }
}

impl Error for RegistryError {}

fn is_valid_extension_id(value: &str) -> bool {
    let mut chars = value.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if c == '.' || c == '_' || c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}

fn is_valid_type_name(value: &str) -> bool {
    value
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
