//! Extension kernel contracts.
//!
//! Extensions declare node types, mark types and slash commands; the kernel
//! freezes those declarations into a [`schema::Schema`]. Runtime loading of
//! third-party extensions is out of scope; only in-process registration is
//! supported.

pub mod builtin;
pub mod content;
pub mod kernel;
pub mod schema;
pub mod spec;
