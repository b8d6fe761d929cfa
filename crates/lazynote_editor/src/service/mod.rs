//! Editor use-case services.
//!
//! # Responsibility
//! - Own the committed document and its history (`editor`).
//! - Tie input routing, debounced outline and auto-save together (`session`).
//! - Keep host layers decoupled from model and transform internals.

pub mod debounce;
pub mod editor;
pub mod error;
pub mod session;
