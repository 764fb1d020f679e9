//! Editor configuration types
//!
//! This module defines the small set of knobs the editor library exposes:
//! defaults applied to incomplete create edits and the emitter layout.

use serde::{Deserialize, Serialize};

/// Configuration for the editor library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Width (bits) given to created signals that do not state one
    #[serde(default = "default_signal_width")]
    pub default_signal_width: u8,

    /// Length (bytes) given to created/rebuilt frames that do not state one
    #[serde(default = "default_frame_length")]
    pub default_frame_length: u8,

    /// Number of spaces per indentation level in emitted files
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
}

fn default_signal_width() -> u8 {
    8
}

fn default_frame_length() -> u8 {
    8
}

fn default_indent_width() -> usize {
    4
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_signal_width: default_signal_width(),
            default_frame_length: default_frame_length(),
            indent_width: default_indent_width(),
        }
    }
}

impl EditorConfig {
    /// Create a new editor configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the default signal width
    pub fn with_default_signal_width(mut self, width: u8) -> Self {
        self.default_signal_width = width;
        self
    }

    /// Builder method: set the default frame length
    pub fn with_default_frame_length(mut self, length: u8) -> Self {
        self.default_frame_length = length;
        self
    }

    /// Builder method: set the emitter indent width
    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    /// Indentation string for one level
    pub fn indent(&self) -> String {
        " ".repeat(self.indent_width)
    }
}
