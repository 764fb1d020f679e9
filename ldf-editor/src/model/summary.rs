//! JSON view of a document
//!
//! The host UI consumes this shape directly: speed in bit/s, master timing in
//! seconds, slaves as a list of names, frame signals as `{signal, offset}`
//! pairs.

use crate::model::document::LdfDocument;
use crate::types::InitValue;
use serde::{Deserialize, Serialize};

/// Serializable summary of a whole document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub protocol_version: String,
    pub language_version: String,
    /// Bus speed in bit/s
    pub speed: u64,
    pub channel_name: Option<String>,
    pub nodes: NodesSummary,
    pub signals: Vec<SignalSummary>,
    pub frames: Vec<FrameSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodesSummary {
    pub master: Option<MasterSummary>,
    pub slaves: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterSummary {
    pub name: String,
    /// Seconds
    pub timebase: f64,
    /// Seconds
    pub jitter: f64,
    /// Bits (LIN 2.2)
    pub max_header_length: Option<u32>,
    /// Fraction of the nominal response time, `0.4` for `40 %` (LIN 2.2)
    pub response_tolerance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub name: String,
    pub width: u8,
    pub init_value: InitValue,
    pub publisher: Option<String>,
    pub subscribers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub name: String,
    pub frame_id: u8,
    pub length: u8,
    pub publisher: Option<String>,
    pub signals: Vec<FrameSignalSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSignalSummary {
    pub signal: String,
    pub offset: u16,
}

impl LdfDocument {
    /// Build the JSON view returned by the `parse` command
    pub fn summary(&self) -> DocumentSummary {
        let header = self.header();
        let master = self.master().and_then(|node| {
            node.timing().map(|timing| MasterSummary {
                name: node.name.clone(),
                timebase: timing.timebase_ms / 1000.0,
                jitter: timing.jitter_ms / 1000.0,
                max_header_length: timing.max_header_length,
                response_tolerance: timing.response_tolerance.map(|percent| percent / 100.0),
            })
        });

        DocumentSummary {
            protocol_version: header.protocol_version.clone(),
            language_version: header.language_version.clone(),
            speed: (header.speed_kbps * 1000.0).round() as u64,
            channel_name: header.channel_name.clone(),
            nodes: NodesSummary {
                master,
                slaves: self.slaves().map(|n| n.name.clone()).collect(),
            },
            signals: self
                .signals()
                .map(|s| SignalSummary {
                    name: s.name.clone(),
                    width: s.width,
                    init_value: s.init_value.clone(),
                    publisher: s.publisher.clone(),
                    subscribers: s.subscribers.iter().cloned().collect(),
                })
                .collect(),
            frames: self
                .frames()
                .map(|f| FrameSummary {
                    name: f.name.clone(),
                    frame_id: f.frame_id,
                    length: f.length,
                    publisher: f.publisher.clone(),
                    signals: f
                        .signals
                        .iter()
                        .map(|(&offset, signal)| FrameSignalSummary {
                            signal: signal.clone(),
                            offset,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
