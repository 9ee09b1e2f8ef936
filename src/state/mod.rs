//! Document storage module for gorc.
//!
//! This module persists the desired-state document: `init` writes it,
//! every other operation reads it.

mod local;
mod store;

pub use local::LocalDocumentStore;
pub use store::DocumentStore;
