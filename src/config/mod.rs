//! Configuration module for gorc.
//!
//! This module handles everything about the desired-state document:
//! - Parsing the YAML document and resolving credentials
//! - Validating the raw document before reconciliation
//! - Fingerprinting resolved state

mod hash;
mod parser;
mod validator;

pub use hash::StateHasher;
pub use parser::{DEFAULT_DOCUMENT_PATH, DocumentParser, TOKEN_ENV};
pub use validator::{ValidationGate, ValidationReport};
