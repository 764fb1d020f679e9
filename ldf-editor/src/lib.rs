//! LDF Editor Library
//!
//! Load, edit and regenerate LIN Description Files (LDF) without writing the
//! file by hand.
//!
//! # Architecture
//!
//! One invocation is one parse → mutate → emit cycle:
//! - [`model`] holds the document: nodes, signals, frames and the sections
//!   the editor does not interpret
//! - [`mutation`] applies ordered create/update/delete batches while keeping
//!   names unique, references resolvable and frame layouts valid
//! - [`Editor`] coordinates the cycle around an injected parser and emitter
//!   and only overwrites the file once everything succeeded
//! - [`command`] turns host requests into responses
//!
//! The library does NOT:
//! - Validate schedule tables, diagnostic frames or checksums
//! - Preserve comments or formatting (the file is regenerated)
//! - Coordinate concurrent writers of the same file
//!
//! # Example Usage
//!
//! ```no_run
//! use ldf_editor::{Editor, FrameEdit, InitValue, SignalEdit};
//! use std::path::Path;
//!
//! let editor = Editor::new();
//! let report = editor
//!     .edit(
//!         Path::new("body.ldf"),
//!         &[SignalEdit::create("EngineSpeed", 16)
//!             .with_init_value(InitValue::Scalar(0))
//!             .with_publisher("ECU1")],
//!         &[FrameEdit::create("StatusFrame", 0x10, 8)
//!             .with_publisher("ECU1")
//!             .with_signal("EngineSpeed", 0)],
//!     )
//!     .unwrap();
//!
//! for warning in &report.diagnostics {
//!     eprintln!("{} '{}': {}", warning.entity, warning.name, warning.message);
//! }
//! ```

// Public modules
pub mod command;
pub mod config;
pub mod editor;
pub mod formats;
pub mod model;
pub mod mutation;
pub mod types;

// Re-export main types for convenience
pub use command::{Dispatcher, Request, Response, SaveData, Status};
pub use config::EditorConfig;
pub use editor::Editor;
pub use formats::{LdfEmitter, LdfParser, TextEmitter, TextParser};
pub use model::{DocumentStats, DocumentSummary, Frame, LdfDocument, Node, Signal};
pub use mutation::{
    Diagnostic, EditAction, EditReport, FrameEdit, MutationEngine, SignalEdit, SignalPlacement,
};
pub use types::{EntityKind, ErrorKind, InitValue, LdfError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
