//! The LDF document registry
//!
//! `LdfDocument` is the sole owner of every entity parsed from a file.
//! Signals and frames refer to nodes and signals by name; every mutating
//! accessor checks those references and the frame layout before it commits,
//! so a failed call leaves the document exactly as it was.

use crate::model::entities::{Frame, Header, Node, OpaqueSection, Signal};
use crate::types::{EntityKind, LdfError, Result};
use indexmap::IndexMap;

/// A parsed LIN description file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LdfDocument {
    header: Header,
    /// Nodes by name (master and slaves)
    nodes: IndexMap<String, Node>,
    /// Signals by name, in definition order
    signals: IndexMap<String, Signal>,
    /// Unconditional frames by name, in definition order
    frames: IndexMap<String, Frame>,
    /// Sections carried through without interpretation
    opaque_sections: Vec<OpaqueSection>,
}

impl LdfDocument {
    /// Create an empty document with the given header
    pub fn new(header: Header) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    // ----- nodes -----

    /// Add a node; a document holds at most one master
    pub fn insert_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(LdfError::DuplicateName {
                kind: EntityKind::Node,
                name: node.name,
            });
        }
        if node.is_master() {
            if let Some(existing) = self.master() {
                return Err(LdfError::ValidationError(format!(
                    "cannot add master '{}': '{}' is already the master",
                    node.name, existing.name
                )));
            }
        }
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn master(&self) -> Option<&Node> {
        self.nodes.values().find(|n| n.is_master())
    }

    pub fn slaves(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| !n.is_master())
    }

    /// Look up a publisher/subscriber name (the master or any slave)
    pub fn resolve_node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    // ----- signals -----

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.values()
    }

    /// Add a new signal
    pub fn insert_signal(&mut self, signal: Signal) -> Result<()> {
        if self.signals.contains_key(&signal.name) {
            return Err(LdfError::DuplicateName {
                kind: EntityKind::Signal,
                name: signal.name,
            });
        }
        self.validate_signal(&signal)?;
        self.signals.insert(signal.name.clone(), signal);
        Ok(())
    }

    /// Swap an existing signal for a new definition under the same name
    ///
    /// Every frame carrying the signal is re-checked against the new width.
    /// Returns the previous definition.
    pub fn replace_signal(&mut self, signal: Signal) -> Result<Signal> {
        if !self.signals.contains_key(&signal.name) {
            return Err(LdfError::NotFound(format!("signal '{}'", signal.name)));
        }
        self.validate_signal(&signal)?;
        if let Some(old) = self.signals.get(&signal.name) {
            if old.width != signal.width {
                for frame in self.frames.values().filter(|f| f.carries(&signal.name)) {
                    self.validate_layout(frame, Some((signal.name.as_str(), signal.width)))?;
                }
            }
        }
        let name = signal.name.clone();
        self.signals
            .insert(name.clone(), signal)
            .ok_or(LdfError::NotFound(format!("signal '{}'", name)))
    }

    /// Remove a signal and detach it from every frame that maps it
    ///
    /// Returns false if no signal had that name.
    pub fn remove_signal(&mut self, name: &str) -> bool {
        if self.signals.shift_remove(name).is_none() {
            return false;
        }
        for frame in self.frames.values_mut() {
            frame.signals.retain(|_, signal| signal.as_str() != name);
        }
        true
    }

    // ----- frames -----

    pub fn frame(&self, name: &str) -> Option<&Frame> {
        self.frames.get(name)
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    pub fn frame_by_id(&self, frame_id: u8) -> Option<&Frame> {
        self.frames.values().find(|f| f.frame_id == frame_id)
    }

    /// Names of the frames that map the given signal
    pub fn frames_carrying(&self, signal: &str) -> Vec<String> {
        self.frames
            .values()
            .filter(|f| f.carries(signal))
            .map(|f| f.name.clone())
            .collect()
    }

    /// Add a new frame
    pub fn insert_frame(&mut self, frame: Frame) -> Result<()> {
        if self.frames.contains_key(&frame.name) {
            return Err(LdfError::DuplicateName {
                kind: EntityKind::Frame,
                name: frame.name,
            });
        }
        self.validate_frame(&frame)?;
        self.frames.insert(frame.name.clone(), frame);
        Ok(())
    }

    /// Swap an existing frame for a rebuilt one under the same name
    ///
    /// Returns the previous definition.
    pub fn replace_frame(&mut self, frame: Frame) -> Result<Frame> {
        if !self.frames.contains_key(&frame.name) {
            return Err(LdfError::NotFound(format!("frame '{}'", frame.name)));
        }
        self.validate_frame(&frame)?;
        let name = frame.name.clone();
        self.frames
            .insert(name.clone(), frame)
            .ok_or(LdfError::NotFound(format!("frame '{}'", name)))
    }

    /// Remove a frame; returns false if no frame had that name
    pub fn remove_frame(&mut self, name: &str) -> bool {
        self.frames.shift_remove(name).is_some()
    }

    // ----- opaque sections -----

    pub fn opaque_sections(&self) -> &[OpaqueSection] {
        &self.opaque_sections
    }

    pub fn push_opaque_section(&mut self, section: OpaqueSection) {
        self.opaque_sections.push(section);
    }

    /// Get document statistics
    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            num_nodes: self.nodes.len(),
            num_signals: self.signals.len(),
            num_frames: self.frames.len(),
            num_opaque_sections: self.opaque_sections.len(),
        }
    }

    // ----- invariant checks -----

    fn check_node_ref(&self, owner: &str, role: &str, node: &str) -> Result<()> {
        if self.nodes.contains_key(node) {
            Ok(())
        } else {
            Err(LdfError::ValidationError(format!(
                "{} of '{}' refers to unknown node '{}'",
                role, owner, node
            )))
        }
    }

    fn validate_signal(&self, signal: &Signal) -> Result<()> {
        signal.validate()?;
        if let Some(publisher) = &signal.publisher {
            self.check_node_ref(&signal.name, "publisher", publisher)?;
        }
        for subscriber in &signal.subscribers {
            self.check_node_ref(&signal.name, "subscriber", subscriber)?;
        }
        Ok(())
    }

    fn validate_frame(&self, frame: &Frame) -> Result<()> {
        frame.validate()?;
        if let Some(publisher) = &frame.publisher {
            self.check_node_ref(&frame.name, "publisher", publisher)?;
        }
        if let Some(other) = self
            .frames
            .values()
            .find(|f| f.frame_id == frame.frame_id && f.name != frame.name)
        {
            return Err(LdfError::ValidationError(format!(
                "frame id 0x{:X} of '{}' is already used by '{}'",
                frame.frame_id, frame.name, other.name
            )));
        }
        self.validate_layout(frame, None)
    }

    /// Check that every mapped signal exists, fits in the payload and does
    /// not overlap its predecessor. `width_override` substitutes a pending
    /// width for one signal.
    fn validate_layout(&self, frame: &Frame, width_override: Option<(&str, u8)>) -> Result<()> {
        let mut previous: Option<(&str, u32)> = None;
        for (&offset, name) in &frame.signals {
            let width = match width_override {
                Some((pending, width)) if pending == name.as_str() => width,
                _ => {
                    self.signals
                        .get(name)
                        .ok_or_else(|| {
                            LdfError::ValidationError(format!(
                                "frame '{}' maps unknown signal '{}'",
                                frame.name, name
                            ))
                        })?
                        .width
                }
            };
            let start = u32::from(offset);
            let end = start + u32::from(width);
            if end > frame.bit_length() {
                return Err(LdfError::RangeError(format!(
                    "signal '{}' at offset {} with width {} exceeds {} bits of frame '{}'",
                    name,
                    offset,
                    width,
                    frame.bit_length(),
                    frame.name
                )));
            }
            if let Some((prev_name, prev_end)) = previous {
                if start < prev_end {
                    return Err(LdfError::ValidationError(format!(
                        "signal '{}' at offset {} overlaps '{}' in frame '{}'",
                        name, offset, prev_name, frame.name
                    )));
                }
            }
            previous = Some((name.as_str(), end));
        }
        Ok(())
    }
}

/// Document statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    pub num_nodes: usize,
    pub num_signals: usize,
    pub num_frames: usize,
    pub num_opaque_sections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entities::MasterTiming;
    use crate::types::{ErrorKind, InitValue};

    fn cluster() -> LdfDocument {
        let mut doc = LdfDocument::new(Header::default());
        doc.insert_node(Node::master("Gateway", MasterTiming::new(5.0, 0.1)))
            .unwrap();
        doc.insert_node(Node::slave("ECU1")).unwrap();
        doc.insert_signal(
            Signal::new("EngineSpeed", 16, InitValue::Scalar(0))
                .with_publisher("ECU1")
                .with_subscriber("Gateway"),
        )
        .unwrap();
        doc.insert_signal(Signal::new("EngineTemp", 8, InitValue::Scalar(0)).with_publisher("ECU1"))
            .unwrap();
        doc.insert_frame(
            Frame::new("EngineData", 0x10, 3)
                .with_publisher("ECU1")
                .with_signal(0, "EngineSpeed")
                .with_signal(16, "EngineTemp"),
        )
        .unwrap();
        doc
    }

    #[test]
    fn test_empty_document() {
        let doc = LdfDocument::default();
        let stats = doc.stats();
        assert_eq!(stats.num_nodes, 0);
        assert_eq!(stats.num_signals, 0);
        assert_eq!(stats.num_frames, 0);
        assert!(doc.master().is_none());
    }

    #[test]
    fn test_single_master() {
        let mut doc = cluster();
        let err = doc
            .insert_node(Node::master("Other", MasterTiming::new(10.0, 0.0)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(doc.master().unwrap().name, "Gateway");
        assert_eq!(doc.slaves().count(), 1);
    }

    #[test]
    fn test_duplicate_signal_leaves_original() {
        let mut doc = cluster();
        let err = doc
            .insert_signal(Signal::new("EngineSpeed", 4, InitValue::Scalar(0)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert_eq!(doc.signal("EngineSpeed").unwrap().width, 16);
    }

    #[test]
    fn test_signal_with_unknown_publisher_rejected() {
        let mut doc = cluster();
        let err = doc
            .insert_signal(Signal::new("X", 4, InitValue::Scalar(0)).with_publisher("Nobody"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(doc.signal("X").is_none());
    }

    #[test]
    fn test_remove_signal_detaches_from_frames() {
        let mut doc = cluster();
        assert_eq!(doc.frames_carrying("EngineTemp"), vec!["EngineData".to_string()]);
        assert!(doc.remove_signal("EngineTemp"));
        assert!(!doc.remove_signal("EngineTemp"));
        let frame = doc.frame("EngineData").unwrap();
        assert_eq!(frame.signals.len(), 1);
        assert!(!frame.carries("EngineTemp"));
    }

    #[test]
    fn test_replace_signal_rejects_width_that_breaks_frame() {
        let mut doc = cluster();
        // Same width in byte-array form still fits
        let array = Signal::new("EngineSpeed", 16, InitValue::Array(vec![0, 0]));
        assert!(doc.replace_signal(array).is_ok());

        // EngineTemp sits at bit 16 of a 24-bit frame
        let mut temp = doc.signal("EngineTemp").unwrap().clone();
        temp.width = 16;
        let err = doc.replace_signal(temp).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
        assert_eq!(doc.signal("EngineTemp").unwrap().width, 8);
    }

    #[test]
    fn test_replace_missing_signal_is_not_found() {
        let mut doc = cluster();
        let err = doc
            .replace_signal(Signal::new("Ghost", 1, InitValue::Scalar(0)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_frame_offset_past_payload() {
        let mut doc = cluster();
        let frame = Frame::new("Short", 0x11, 1).with_signal(0, "EngineSpeed");
        let err = doc.insert_frame(frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeError);
        assert!(doc.frame("Short").is_none());
    }

    #[test]
    fn test_frame_overlap() {
        let mut doc = cluster();
        let frame = Frame::new("Clash", 0x11, 8)
            .with_signal(0, "EngineSpeed")
            .with_signal(8, "EngineTemp");
        let err = doc.insert_frame(frame).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(doc.stats().num_frames, 1);
    }

    #[test]
    fn test_frame_id_unique() {
        let mut doc = cluster();
        let err = doc.insert_frame(Frame::new("Twin", 0x10, 2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        // Rebuilding a frame may keep its own id
        let rebuilt = Frame::new("EngineData", 0x10, 8).with_signal(0, "EngineTemp");
        let old = doc.replace_frame(rebuilt).unwrap();
        assert_eq!(old.length, 3);
        assert_eq!(doc.frame("EngineData").unwrap().length, 8);
    }

    #[test]
    fn test_remove_frame() {
        let mut doc = cluster();
        assert!(doc.remove_frame("EngineData"));
        assert!(!doc.remove_frame("EngineData"));
        assert!(doc.frame_by_id(0x10).is_none());
    }

    #[test]
    fn test_structural_equality_ignores_subscriber_order() {
        let mut a = LdfDocument::default();
        let mut b = LdfDocument::default();
        for doc in [&mut a, &mut b] {
            doc.insert_node(Node::slave("S1")).unwrap();
            doc.insert_node(Node::slave("S2")).unwrap();
        }
        a.insert_signal(
            Signal::new("Sig", 1, InitValue::Scalar(0))
                .with_subscriber("S1")
                .with_subscriber("S2"),
        )
        .unwrap();
        b.insert_signal(
            Signal::new("Sig", 1, InitValue::Scalar(0))
                .with_subscriber("S2")
                .with_subscriber("S1"),
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
