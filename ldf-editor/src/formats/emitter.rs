//! LDF text emitter
//!
//! Renders a document back into LDF syntax. Output is deterministic: header,
//! nodes, signals and frames in registry order, then opaque sections exactly
//! as they were read. Comments and original whitespace are not preserved.

use crate::config::EditorConfig;
use crate::formats::LdfEmitter;
use crate::model::{Frame, LdfDocument, Signal};
use crate::types::{LdfError, Result};
use std::fmt::Write;

/// Emitter for the LDF text format
#[derive(Debug, Clone)]
pub struct TextEmitter {
    indent: String,
}

impl TextEmitter {
    pub fn new() -> Self {
        Self::from_config(&EditorConfig::default())
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            indent: config.indent(),
        }
    }

    fn emit_header(&self, doc: &LdfDocument, out: &mut String) -> std::fmt::Result {
        let header = doc.header();
        writeln!(out, "LIN_description_file;")?;
        writeln!(out, "LIN_protocol_version = \"{}\";", header.protocol_version)?;
        writeln!(out, "LIN_language_version = \"{}\";", header.language_version)?;
        writeln!(out, "LIN_speed = {} kbps;", header.speed_kbps)?;
        if let Some(channel) = &header.channel_name {
            writeln!(out, "Channel_name = \"{}\";", channel)?;
        }
        writeln!(out)
    }

    fn emit_nodes(&self, doc: &LdfDocument, out: &mut String) -> std::fmt::Result {
        writeln!(out, "Nodes {{")?;
        if let Some(master) = doc.master() {
            if let Some(timing) = master.timing() {
                write!(
                    out,
                    "{}Master: {}, {} ms, {} ms",
                    self.indent, master.name, timing.timebase_ms, timing.jitter_ms
                )?;
                if let (Some(bits), Some(tolerance)) =
                    (timing.max_header_length, timing.response_tolerance)
                {
                    write!(out, ", {} bits, {} %", bits, tolerance)?;
                }
                writeln!(out, ";")?;
            }
        }
        let slaves: Vec<&str> = doc.slaves().map(|n| n.name.as_str()).collect();
        if !slaves.is_empty() {
            writeln!(out, "{}Slaves: {};", self.indent, slaves.join(", "))?;
        }
        writeln!(out, "}}")?;
        writeln!(out)
    }

    fn emit_signal(&self, signal: &Signal, out: &mut String) -> Result<()> {
        let publisher = signal.publisher.as_deref().ok_or_else(|| {
            LdfError::InternalError(format!(
                "signal '{}' has no publisher and cannot be written",
                signal.name
            ))
        })?;
        write!(
            out,
            "{}{}: {}, {}, {}",
            self.indent, signal.name, signal.width, signal.init_value, publisher
        )
        .map_err(fmt_error)?;
        for subscriber in &signal.subscribers {
            write!(out, ", {}", subscriber).map_err(fmt_error)?;
        }
        writeln!(out, ";").map_err(fmt_error)
    }

    fn emit_frame(&self, frame: &Frame, out: &mut String) -> Result<()> {
        let publisher = frame.publisher.as_deref().ok_or_else(|| {
            LdfError::InternalError(format!(
                "frame '{}' has no publisher and cannot be written",
                frame.name
            ))
        })?;
        writeln!(
            out,
            "{}{}: 0x{:02X}, {}, {} {{",
            self.indent, frame.name, frame.frame_id, publisher, frame.length
        )
        .map_err(fmt_error)?;
        for (offset, signal) in &frame.signals {
            writeln!(out, "{0}{0}{1}, {2};", self.indent, signal, offset).map_err(fmt_error)?;
        }
        writeln!(out, "{}}}", self.indent).map_err(fmt_error)
    }
}

impl Default for TextEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl LdfEmitter for TextEmitter {
    fn emit(&self, doc: &LdfDocument) -> Result<String> {
        let mut out = String::new();
        self.emit_header(doc, &mut out).map_err(fmt_error)?;
        self.emit_nodes(doc, &mut out).map_err(fmt_error)?;

        out.push_str("Signals {\n");
        for signal in doc.signals() {
            self.emit_signal(signal, &mut out)?;
        }
        out.push_str("}\n\n");

        out.push_str("Frames {\n");
        for frame in doc.frames() {
            self.emit_frame(frame, &mut out)?;
        }
        out.push_str("}\n");

        for section in doc.opaque_sections() {
            out.push('\n');
            out.push_str(&section.text);
            out.push('\n');
        }

        log::debug!("Emitted {} bytes of LDF text", out.len());
        Ok(out)
    }
}

fn fmt_error(e: std::fmt::Error) -> LdfError {
    LdfError::InternalError(format!("formatting failed: {}", e))
}
