//! Mutation Engine
//!
//! Applies ordered batches of signal and frame edits to an [`LdfDocument`].
//! Edits run in the order given; the first failing create/update stops the
//! batch and is returned wrapped with its position. Edits before it stay
//! applied. Deleting something that does not exist is a no-op.
//!
//! Subscriber and frame-signal names that do not resolve are dropped from
//! the entity being built and reported as [`Diagnostic`]s in the
//! [`EditReport`]. An unknown publisher fails the edit with
//! `ValidationError`.

use crate::config::EditorConfig;
use crate::model::{Frame, LdfDocument, Signal};
use crate::types::{EntityKind, InitValue, LdfError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What an edit record does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditAction {
    Create,
    Update,
    Delete,
}

/// One signal edit
///
/// Fields left as `None` keep their previous value on update and take the
/// configured default on create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEdit {
    #[serde(alias = "_action")]
    pub action: EditAction,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, alias = "initValue", skip_serializing_if = "Option::is_none")]
    pub init_value: Option<InitValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribers: Option<Vec<String>>,
}

impl SignalEdit {
    fn with_action(action: EditAction, name: impl Into<String>) -> Self {
        Self {
            action,
            name: name.into(),
            width: None,
            init_value: None,
            publisher: None,
            subscribers: None,
        }
    }

    pub fn create(name: impl Into<String>, width: u32) -> Self {
        Self::with_action(EditAction::Create, name).with_width(width)
    }

    pub fn update(name: impl Into<String>) -> Self {
        Self::with_action(EditAction::Update, name)
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self::with_action(EditAction::Delete, name)
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_init_value(mut self, value: InitValue) -> Self {
        self.init_value = Some(value);
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_subscribers<S: Into<String>>(
        mut self,
        subscribers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.subscribers = Some(subscribers.into_iter().map(Into::into).collect());
        self
    }
}

/// A signal placed at a bit offset inside a frame edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPlacement {
    pub signal: String,
    #[serde(default)]
    pub offset: u32,
}

/// One frame edit (create/update always rebuild the whole frame)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEdit {
    #[serde(alias = "_action")]
    pub action: EditAction,
    pub name: String,
    #[serde(default, alias = "frameId", skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<Vec<SignalPlacement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

impl FrameEdit {
    fn with_action(action: EditAction, name: impl Into<String>) -> Self {
        Self {
            action,
            name: name.into(),
            frame_id: None,
            length: None,
            signals: None,
            publisher: None,
        }
    }

    pub fn create(name: impl Into<String>, frame_id: u32, length: u32) -> Self {
        let mut edit = Self::with_action(EditAction::Create, name);
        edit.frame_id = Some(frame_id);
        edit.length = Some(length);
        edit
    }

    pub fn update(name: impl Into<String>, frame_id: u32, length: u32) -> Self {
        let mut edit = Self::create(name, frame_id, length);
        edit.action = EditAction::Update;
        edit
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self::with_action(EditAction::Delete, name)
    }

    pub fn with_signal(mut self, signal: impl Into<String>, offset: u32) -> Self {
        self.signals.get_or_insert_with(Vec::new).push(SignalPlacement {
            signal: signal.into(),
            offset,
        });
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }
}

/// A non-fatal note produced while applying edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// `"signal"` or `"frame"`
    pub entity: String,
    /// Name of the edited entity
    pub name: String,
    pub message: String,
}

/// Outcome of a successful batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl EditReport {
    /// Fold another report into this one
    pub fn merge(&mut self, other: EditReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.diagnostics.extend(other.diagnostics);
    }

    fn note(&mut self, entity: EntityKind, name: &str, message: String) {
        log::warn!("{} '{}': {}", entity, name, message);
        self.diagnostics.push(Diagnostic {
            entity: entity.to_string().to_lowercase(),
            name: name.to_string(),
            message,
        });
    }
}

/// Applies edit batches using the configured defaults
#[derive(Debug, Clone, Default)]
pub struct MutationEngine {
    config: EditorConfig,
}

impl MutationEngine {
    pub fn new(config: EditorConfig) -> Self {
        Self { config }
    }

    /// Apply signal edits in order
    pub fn apply_signal_edits(
        &self,
        doc: &mut LdfDocument,
        edits: &[SignalEdit],
    ) -> Result<EditReport> {
        let mut report = EditReport::default();
        self.apply_signal_batch(doc, edits, &mut report)?;
        Ok(report)
    }

    /// Apply frame edits in order
    pub fn apply_frame_edits(
        &self,
        doc: &mut LdfDocument,
        edits: &[FrameEdit],
    ) -> Result<EditReport> {
        let mut report = EditReport::default();
        self.apply_frame_batch(doc, edits, &mut report)?;
        Ok(report)
    }

    /// Apply signal edits, recording into `report`
    ///
    /// Counts and diagnostics of the edits before a failure stay in `report`.
    pub fn apply_signal_batch(
        &self,
        doc: &mut LdfDocument,
        edits: &[SignalEdit],
        report: &mut EditReport,
    ) -> Result<()> {
        for (index, edit) in edits.iter().enumerate() {
            log::debug!("Signal edit #{}: {:?} '{}'", index, edit.action, edit.name);
            self.apply_signal_edit(doc, edit, report)
                .map_err(|e| LdfError::EditFailed {
                    entity: EntityKind::Signal,
                    index,
                    name: edit.name.clone(),
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    /// Apply frame edits, recording into `report`
    pub fn apply_frame_batch(
        &self,
        doc: &mut LdfDocument,
        edits: &[FrameEdit],
        report: &mut EditReport,
    ) -> Result<()> {
        for (index, edit) in edits.iter().enumerate() {
            log::debug!("Frame edit #{}: {:?} '{}'", index, edit.action, edit.name);
            self.apply_frame_edit(doc, edit, report)
                .map_err(|e| LdfError::EditFailed {
                    entity: EntityKind::Frame,
                    index,
                    name: edit.name.clone(),
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    fn apply_signal_edit(
        &self,
        doc: &mut LdfDocument,
        edit: &SignalEdit,
        report: &mut EditReport,
    ) -> Result<()> {
        require_name(&edit.name)?;

        match edit.action {
            EditAction::Delete => {
                let carriers = doc.frames_carrying(&edit.name);
                if doc.remove_signal(&edit.name) {
                    report.deleted += 1;
                    for frame in carriers {
                        report.note(
                            EntityKind::Signal,
                            &edit.name,
                            format!("removed from frame '{}'", frame),
                        );
                    }
                } else {
                    log::debug!("Signal '{}' not present, nothing to delete", edit.name);
                }
            }
            EditAction::Create => {
                let width = to_u8(
                    edit.width
                        .unwrap_or(u32::from(self.config.default_signal_width)),
                    || format!("signal '{}' width", edit.name),
                )?;
                let init_value = edit.init_value.clone().unwrap_or_default();
                let mut signal = Signal::new(edit.name.clone(), width, init_value);
                if let Some(publisher) = &edit.publisher {
                    signal.publisher =
                        require_publisher(doc, EntityKind::Signal, &edit.name, publisher)?;
                }
                for subscriber in edit.subscribers.iter().flatten() {
                    if let Some(node) = resolve_subscriber(doc, &edit.name, subscriber, report) {
                        signal.subscribers.insert(node);
                    }
                }
                doc.insert_signal(signal)?;
                report.created += 1;
            }
            EditAction::Update => {
                let mut signal = doc
                    .signal(&edit.name)
                    .cloned()
                    .ok_or_else(|| LdfError::NotFound(format!("signal '{}'", edit.name)))?;
                if let Some(width) = edit.width {
                    signal.width = to_u8(width, || format!("signal '{}' width", edit.name))?;
                }
                if let Some(init_value) = &edit.init_value {
                    signal.init_value = init_value.clone();
                }
                if let Some(publisher) = edit.publisher.as_deref().filter(|p| !p.is_empty()) {
                    signal.publisher =
                        require_publisher(doc, EntityKind::Signal, &edit.name, publisher)?;
                }
                if let Some(subscribers) = &edit.subscribers {
                    signal.subscribers.clear();
                    for subscriber in subscribers {
                        if let Some(node) = resolve_subscriber(doc, &edit.name, subscriber, report)
                        {
                            signal.subscribers.insert(node);
                        }
                    }
                }
                doc.replace_signal(signal)?;
                report.updated += 1;
            }
        }
        Ok(())
    }

    fn apply_frame_edit(
        &self,
        doc: &mut LdfDocument,
        edit: &FrameEdit,
        report: &mut EditReport,
    ) -> Result<()> {
        require_name(&edit.name)?;

        if edit.action == EditAction::Delete {
            if doc.remove_frame(&edit.name) {
                report.deleted += 1;
            } else {
                log::debug!("Frame '{}' not present, nothing to delete", edit.name);
            }
            return Ok(());
        }

        let mut frame = self.build_frame(doc, edit, report)?;
        if edit.action == EditAction::Create {
            doc.insert_frame(frame)?;
            report.created += 1;
        } else {
            let previous = doc
                .frame(&edit.name)
                .ok_or_else(|| LdfError::NotFound(format!("frame '{}'", edit.name)))?;
            // An update that names no publisher keeps the current one
            if frame.publisher.is_none() {
                frame.publisher = previous.publisher.clone();
            }
            doc.replace_frame(frame)?;
            report.updated += 1;
        }
        Ok(())
    }

    /// Rebuild a frame from scratch out of an edit record
    fn build_frame(
        &self,
        doc: &LdfDocument,
        edit: &FrameEdit,
        report: &mut EditReport,
    ) -> Result<Frame> {
        let frame_id = to_u8(edit.frame_id.unwrap_or(0), || {
            format!("frame '{}' id", edit.name)
        })?;
        let length = to_u8(
            edit.length
                .unwrap_or(u32::from(self.config.default_frame_length)),
            || format!("frame '{}' length", edit.name),
        )?;

        let mut signals = BTreeMap::new();
        for placement in edit.signals.iter().flatten() {
            if placement.signal.is_empty() {
                continue;
            }
            if doc.signal(&placement.signal).is_none() {
                report.note(
                    EntityKind::Frame,
                    &edit.name,
                    format!("unknown signal '{}' dropped", placement.signal),
                );
                continue;
            }
            let offset = u16::try_from(placement.offset).map_err(|_| {
                LdfError::RangeError(format!(
                    "offset {} of signal '{}' in frame '{}'",
                    placement.offset, placement.signal, edit.name
                ))
            })?;
            if let Some(existing) = signals.insert(offset, placement.signal.clone()) {
                return Err(LdfError::ValidationError(format!(
                    "signals '{}' and '{}' both placed at offset {} in frame '{}'",
                    existing, placement.signal, offset, edit.name
                )));
            }
        }

        let mut frame = Frame::new(edit.name.clone(), frame_id, length);
        frame.signals = signals;
        if let Some(publisher) = &edit.publisher {
            frame.publisher = require_publisher(doc, EntityKind::Frame, &edit.name, publisher)?;
        }
        Ok(frame)
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LdfError::ValidationError("edit has an empty name".to_string()));
    }
    Ok(())
}

fn to_u8(value: u32, what: impl FnOnce() -> String) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| LdfError::RangeError(format!("{} {} is too large", what(), value)))
}

/// Resolve a publisher name. An empty name means "not given"; an unknown
/// one fails the edit since LDF cannot write an entity without a publisher.
fn require_publisher(
    doc: &LdfDocument,
    entity: EntityKind,
    owner: &str,
    publisher: &str,
) -> Result<Option<String>> {
    if publisher.is_empty() {
        return Ok(None);
    }
    match doc.resolve_node(publisher) {
        Some(node) => Ok(Some(node.name.clone())),
        None => Err(LdfError::ValidationError(format!(
            "publisher '{}' of {} '{}' is not a known node",
            publisher,
            entity.to_string().to_lowercase(),
            owner
        ))),
    }
}

/// Resolve a subscriber name, recording a diagnostic when it is unknown
fn resolve_subscriber(
    doc: &LdfDocument,
    owner: &str,
    node: &str,
    report: &mut EditReport,
) -> Option<String> {
    if node.is_empty() {
        return None;
    }
    match doc.resolve_node(node) {
        Some(found) => Some(found.name.clone()),
        None => {
            report.note(
                EntityKind::Signal,
                owner,
                format!("unknown subscriber '{}' dropped", node),
            );
            None
        }
    }
}
