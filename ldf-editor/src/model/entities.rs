//! LDF entity definitions
//!
//! Plain data types for the nodes, signals and frames of a LIN cluster.
//! Cross-entity invariants (unique names, resolvable references, frame
//! layout) are enforced by [`LdfDocument`](super::LdfDocument); the checks
//! here only look at a single entity.

use crate::types::{InitValue, LdfError, Result};
use indexmap::IndexSet;
use std::collections::BTreeMap;

/// Widest scalar signal in bits
pub const MAX_SCALAR_WIDTH: u8 = 16;

/// Largest byte-array signal in bytes
pub const MAX_ARRAY_BYTES: usize = 8;

/// Highest frame identifier (6-bit protected identifier space)
pub const MAX_FRAME_ID: u8 = 0x3F;

/// Largest frame payload in bytes
pub const MAX_FRAME_LENGTH: u8 = 8;

/// File header statements
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// `LIN_protocol_version`
    pub protocol_version: String,
    /// `LIN_language_version`
    pub language_version: String,
    /// `LIN_speed` in kbit/s
    pub speed_kbps: f64,
    /// `Channel_name` (optional, LIN 2.2)
    pub channel_name: Option<String>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            protocol_version: "2.1".to_string(),
            language_version: "2.1".to_string(),
            speed_kbps: 19.2,
            channel_name: None,
        }
    }
}

/// Master scheduling parameters from the `Nodes` section
#[derive(Debug, Clone, PartialEq)]
pub struct MasterTiming {
    /// Time base in milliseconds
    pub timebase_ms: f64,
    /// Jitter in milliseconds
    pub jitter_ms: f64,
    /// Maximum header length in bits (LIN 2.2)
    pub max_header_length: Option<u32>,
    /// Response tolerance in percent (LIN 2.2)
    pub response_tolerance: Option<f64>,
}

impl MasterTiming {
    pub fn new(timebase_ms: f64, jitter_ms: f64) -> Self {
        Self {
            timebase_ms,
            jitter_ms,
            max_header_length: None,
            response_tolerance: None,
        }
    }
}

/// Role of a node on the bus
#[derive(Debug, Clone, PartialEq)]
pub enum NodeRole {
    /// The single schedule owner
    Master(MasterTiming),
    /// A responding node
    Slave,
}

/// A bus participant
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub role: NodeRole,
}

impl Node {
    /// Create the master node
    pub fn master(name: impl Into<String>, timing: MasterTiming) -> Self {
        Self {
            name: name.into(),
            role: NodeRole::Master(timing),
        }
    }

    /// Create a slave node
    pub fn slave(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: NodeRole::Slave,
        }
    }

    pub fn is_master(&self) -> bool {
        matches!(self.role, NodeRole::Master(_))
    }

    /// Master timing, if this is the master
    pub fn timing(&self) -> Option<&MasterTiming> {
        match &self.role {
            NodeRole::Master(timing) => Some(timing),
            NodeRole::Slave => None,
        }
    }
}

/// A signal definition from the `Signals` section
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Signal name
    pub name: String,
    /// Width in bits
    pub width: u8,
    /// Initial value (scalar or byte array)
    pub init_value: InitValue,
    /// Publishing node name
    pub publisher: Option<String>,
    /// Subscribing node names (compared as a set)
    pub subscribers: IndexSet<String>,
}

impl Signal {
    /// Create a signal without publisher or subscribers
    pub fn new(name: impl Into<String>, width: u8, init_value: InitValue) -> Self {
        Self {
            name: name.into(),
            width,
            init_value,
            publisher: None,
            subscribers: IndexSet::new(),
        }
    }

    /// Builder method: set the publisher
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Builder method: add a subscriber
    pub fn with_subscriber(mut self, subscriber: impl Into<String>) -> Self {
        self.subscribers.insert(subscriber.into());
        self
    }

    /// Check width and initial value bounds
    pub fn validate(&self) -> Result<()> {
        match &self.init_value {
            InitValue::Scalar(value) => {
                if self.width == 0 || self.width > MAX_SCALAR_WIDTH {
                    return Err(LdfError::RangeError(format!(
                        "signal '{}' width {} is outside 1..={}",
                        self.name, self.width, MAX_SCALAR_WIDTH
                    )));
                }
                if *value >= 1u64 << self.width {
                    return Err(LdfError::RangeError(format!(
                        "signal '{}' initial value {} does not fit in {} bits",
                        self.name, value, self.width
                    )));
                }
            }
            InitValue::Array(bytes) => {
                if bytes.is_empty() || bytes.len() > MAX_ARRAY_BYTES {
                    return Err(LdfError::RangeError(format!(
                        "signal '{}' byte array has {} bytes, expected 1..={}",
                        self.name,
                        bytes.len(),
                        MAX_ARRAY_BYTES
                    )));
                }
                if self.width as usize != bytes.len() * 8 {
                    return Err(LdfError::RangeError(format!(
                        "signal '{}' width {} does not match {}-byte initial value",
                        self.name,
                        self.width,
                        bytes.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// An unconditional frame from the `Frames` section
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Frame name
    pub name: String,
    /// Frame identifier (0..=0x3F)
    pub frame_id: u8,
    /// Payload length in bytes
    pub length: u8,
    /// Publishing node name
    pub publisher: Option<String>,
    /// Bit offset → signal name
    pub signals: BTreeMap<u16, String>,
}

impl Frame {
    /// Create an empty frame
    pub fn new(name: impl Into<String>, frame_id: u8, length: u8) -> Self {
        Self {
            name: name.into(),
            frame_id,
            length,
            publisher: None,
            signals: BTreeMap::new(),
        }
    }

    /// Builder method: set the publisher
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Builder method: place a signal at a bit offset
    pub fn with_signal(mut self, offset: u16, signal: impl Into<String>) -> Self {
        self.signals.insert(offset, signal.into());
        self
    }

    /// Payload size in bits
    pub fn bit_length(&self) -> u32 {
        u32::from(self.length) * 8
    }

    /// True if the frame maps the named signal at any offset
    pub fn carries(&self, signal: &str) -> bool {
        self.signals.values().any(|s| s == signal)
    }

    /// Check identifier and length bounds
    pub fn validate(&self) -> Result<()> {
        if self.frame_id > MAX_FRAME_ID {
            return Err(LdfError::RangeError(format!(
                "frame '{}' id 0x{:X} exceeds 0x{:X}",
                self.name, self.frame_id, MAX_FRAME_ID
            )));
        }
        if self.length == 0 || self.length > MAX_FRAME_LENGTH {
            return Err(LdfError::RangeError(format!(
                "frame '{}' length {} is outside 1..={} bytes",
                self.name, self.length, MAX_FRAME_LENGTH
            )));
        }
        Ok(())
    }
}

/// A section the model does not interpret, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpaqueSection {
    /// Leading keyword (e.g. `Schedule_tables`)
    pub name: String,
    /// Source text from the keyword through the closing brace or semicolon
    pub text: String,
}
