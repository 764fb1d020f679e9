//! Round-trip coordinator
//!
//! The `Editor` is the entry point for loading and editing LDF files. It runs
//! one parse → mutate → emit cycle per call with the parser and emitter it
//! was built with.

use crate::config::EditorConfig;
use crate::formats::{LdfEmitter, LdfParser, TextEmitter, TextParser};
use crate::model::LdfDocument;
use crate::mutation::{EditReport, FrameEdit, MutationEngine, SignalEdit};
use crate::types::{LdfError, Result};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// The main editor struct - entry point for all file operations
pub struct Editor<P = TextParser, E = TextEmitter> {
    parser: P,
    emitter: E,
    engine: MutationEngine,
}

impl Editor {
    /// Create an editor using the bundled text parser and emitter
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    /// Create an editor with the bundled text format and a custom configuration
    pub fn with_config(config: EditorConfig) -> Self {
        let emitter = TextEmitter::from_config(&config);
        Self::with_collaborators(TextParser::new(), emitter, config)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: LdfParser, E: LdfEmitter> Editor<P, E> {
    /// Create an editor with injected parser and emitter
    pub fn with_collaborators(parser: P, emitter: E, config: EditorConfig) -> Self {
        Self {
            parser,
            emitter,
            engine: MutationEngine::new(config),
        }
    }

    /// Read and parse an LDF file
    ///
    /// Bytes that are not valid UTF-8 (Latin-1 comments, typically) are
    /// replaced before parsing.
    ///
    /// # Arguments
    /// * `path` - Path to the LDF file
    ///
    /// # Returns
    /// * `Result<LdfDocument>` - `NotFound` if the file does not exist,
    ///   `ParseError` if its contents are malformed
    ///
    /// # Example
    /// ```no_run
    /// use ldf_editor::Editor;
    /// use std::path::Path;
    ///
    /// let editor = Editor::new();
    /// let doc = editor.load(Path::new("body.ldf")).unwrap();
    /// println!("{} frames", doc.stats().num_frames);
    /// ```
    pub fn load(&self, path: &Path) -> Result<LdfDocument> {
        log::info!("Loading LDF file: {:?}", path);

        if !path.is_file() {
            return Err(LdfError::NotFound(path.display().to_string()));
        }

        // The handle is closed as soon as the bytes are in memory
        let text = match String::from_utf8(fs::read(path)?) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("{:?} is not valid UTF-8, replacing undecodable bytes", path);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        let doc = self.parser.parse(&text)?;

        log::info!("LDF file loaded: {:?}", doc.stats());
        Ok(doc)
    }

    /// Apply edits to the file at `path` and overwrite it
    ///
    /// Signal edits run before frame edits. Nothing is written unless all
    /// edits and the emission succeed; the original file is then replaced in
    /// one rename.
    ///
    /// # Example
    /// ```no_run
    /// use ldf_editor::{Editor, FrameEdit, SignalEdit};
    /// use std::path::Path;
    ///
    /// let editor = Editor::new();
    /// let report = editor
    ///     .edit(
    ///         Path::new("body.ldf"),
    ///         &[SignalEdit::create("EngineSpeed", 16).with_publisher("ECU1")],
    ///         &[FrameEdit::create("StatusFrame", 0x10, 8).with_signal("EngineSpeed", 0)],
    ///     )
    ///     .unwrap();
    /// println!("{} created", report.created);
    /// ```
    pub fn edit(
        &self,
        path: &Path,
        signal_edits: &[SignalEdit],
        frame_edits: &[FrameEdit],
    ) -> Result<EditReport> {
        let mut report = EditReport::default();
        self.edit_with_report(path, signal_edits, frame_edits, &mut report)?;
        Ok(report)
    }

    /// Like [`Editor::edit`], recording into `report`
    ///
    /// Diagnostics collected before a failure stay in `report`.
    pub fn edit_with_report(
        &self,
        path: &Path,
        signal_edits: &[SignalEdit],
        frame_edits: &[FrameEdit],
        report: &mut EditReport,
    ) -> Result<()> {
        let mut doc = self.load(path)?;

        self.engine.apply_signal_batch(&mut doc, signal_edits, report)?;
        self.engine.apply_frame_batch(&mut doc, frame_edits, report)?;
        log::info!(
            "Applied edits: {} created, {} updated, {} deleted, {} diagnostics",
            report.created,
            report.updated,
            report.deleted,
            report.diagnostics.len()
        );

        let text = self.emitter.emit(&doc)?;
        write_replacing(path, &text)?;

        log::info!("LDF file saved: {:?}", path);
        Ok(())
    }

    /// Apply edits to an in-memory document
    pub fn apply(
        &self,
        doc: &mut LdfDocument,
        signal_edits: &[SignalEdit],
        frame_edits: &[FrameEdit],
    ) -> Result<EditReport> {
        let mut report = EditReport::default();
        self.engine.apply_signal_batch(doc, signal_edits, &mut report)?;
        self.engine.apply_frame_batch(doc, frame_edits, &mut report)?;
        Ok(report)
    }
}

/// Write `text` to a temporary file next to `path`, then rename it over `path`
///
/// The replacement keeps the permissions of the file it replaces. On error
/// the temporary file is removed and `path` is untouched.
fn write_replacing(path: &Path, text: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)?.permissions();

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
    }
    tmp.as_file().set_permissions(permissions)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, InitValue};
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SMALL_LDF: &str = "LIN_description_file;\n\
        LIN_protocol_version = \"2.1\";\n\
        LIN_language_version = \"2.1\";\n\
        LIN_speed = 19.2 kbps;\n\
        Nodes { Master: Gateway, 5 ms, 0.1 ms; Slaves: ECU1; }\n\
        Signals { Door: 1, 0, ECU1, Gateway; }\n\
        Frames { DoorStatus: 0x01, ECU1, 1 { Door, 0; } }\n";

    fn ldf_in(dir: &TempDir, content: &[u8]) -> PathBuf {
        let path = dir.path().join("body.ldf");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let editor = Editor::new();
        let err = editor.load(Path::new("/definitely/not/here.ldf")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_load_latin1_comment() {
        let dir = TempDir::new().unwrap();
        let mut content = b"// T\xe4r links\n".to_vec();
        content.extend_from_slice(SMALL_LDF.as_bytes());
        let path = ldf_in(&dir, &content);

        let doc = Editor::new().load(&path).unwrap();
        assert!(doc.signal("Door").is_some());
    }

    #[test]
    fn test_sibling_tmp_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let path = ldf_in(&dir, SMALL_LDF.as_bytes());
        let sibling = dir.path().join("body.ldf.tmp");
        fs::write(&sibling, "keep me").unwrap();

        Editor::new()
            .edit(&path, &[SignalEdit::update("Door").with_init_value(InitValue::Scalar(1))], &[])
            .unwrap();

        assert_eq!(fs::read_to_string(&sibling).unwrap(), "keep me");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_replacement_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = ldf_in(&dir, SMALL_LDF.as_bytes());
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        Editor::new().edit(&path, &[], &[]).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_failed_edit_keeps_earlier_diagnostics() {
        let dir = TempDir::new().unwrap();
        let path = ldf_in(&dir, SMALL_LDF.as_bytes());

        let mut report = EditReport::default();
        let err = Editor::new()
            .edit_with_report(
                &path,
                &[SignalEdit::create("Lamp", 1)
                    .with_publisher("Gateway")
                    .with_subscribers(["ECU7"])],
                &[FrameEdit::create("Clash", 0x01, 1).with_publisher("ECU1")],
                &mut report,
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].message.contains("ECU7"));
        assert_eq!(fs::read_to_string(&path).unwrap(), SMALL_LDF);
    }

    #[test]
    fn test_apply_in_memory() {
        let mut doc = TextParser::new().parse(SMALL_LDF).unwrap();
        let report = Editor::new()
            .apply(
                &mut doc,
                &[SignalEdit::create("Lamp", 2).with_publisher("Gateway")],
                &[FrameEdit::update("DoorStatus", 0x01, 1)
                    .with_signal("Door", 0)
                    .with_signal("Lamp", 1)],
            )
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        let frame = doc.frame("DoorStatus").unwrap();
        assert_eq!(frame.signals.len(), 2);
        assert_eq!(frame.publisher.as_deref(), Some("ECU1"));
    }
}
