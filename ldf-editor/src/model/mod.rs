//! LDF document model
//!
//! Entity types plus the registry that owns them.

pub mod document;
pub mod entities;
pub mod summary;

// Re-export key types for convenience
pub use document::{DocumentStats, LdfDocument};
pub use entities::{
    Frame, Header, MasterTiming, Node, NodeRole, OpaqueSection, Signal, MAX_ARRAY_BYTES,
    MAX_FRAME_ID, MAX_FRAME_LENGTH, MAX_SCALAR_WIDTH,
};
pub use summary::{
    DocumentSummary, FrameSignalSummary, FrameSummary, MasterSummary, NodesSummary,
    SignalSummary,
};
