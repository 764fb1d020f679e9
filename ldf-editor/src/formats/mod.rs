//! LDF text format
//!
//! The round-trip coordinator only talks to the [`LdfParser`] and
//! [`LdfEmitter`] traits; this module provides the bundled text
//! implementations of both.

use crate::model::LdfDocument;
use crate::types::Result;

pub mod emitter;
pub mod lexer;
pub mod parser;

// Re-export implementations
pub use emitter::TextEmitter;
pub use parser::TextParser;

/// Turns LDF text into a document
pub trait LdfParser {
    /// Parse a complete file; fails with `ParseError` on malformed input
    fn parse(&self, text: &str) -> Result<LdfDocument>;
}

/// Renders a document as LDF text
pub trait LdfEmitter {
    /// Render every entity; an entity that cannot be written is an `InternalError`
    fn emit(&self, doc: &LdfDocument) -> Result<String>;
}
