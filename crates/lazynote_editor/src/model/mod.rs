//! Document tree domain model.
//!
//! # Responsibility
//! - Define the node/mark/attribute data shared by every editor subsystem.
//! - Provide path and range addressing for transactional edits.
//!
//! # Invariants
//! - Model types are pure data; validation lives in the schema layer.
//! - Documents are immutable versions; edits always build a new version.

pub mod document;
pub mod node;
pub mod path;
