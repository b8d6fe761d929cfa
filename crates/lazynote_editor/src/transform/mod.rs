//! Transactional document mutation.
//!
//! # Responsibility
//! - Define primitive steps (`insert`, `delete`, `setAttrs`, `replaceRange`).
//! - Fold steps into transactions and capture their inverses for history.
//!
//! # Invariants
//! - Steps are pure functions of (document, parameters).
//! - A transaction either applies fully or not at all.

pub mod history;
pub mod step;
pub mod transaction;
