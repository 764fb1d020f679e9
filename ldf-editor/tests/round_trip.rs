// End-to-end parse → edit → save cycles against files on disk
use ldf_editor::{
    Dispatcher, EditorConfig, Editor, ErrorKind, FrameEdit, InitValue, LdfDocument, LdfEmitter,
    LdfError, SignalEdit, TextParser,
};
use std::io::Write;
use tempfile::NamedTempFile;

const BODY_LDF: &str = r#"
// Body cluster
LIN_description_file;
LIN_protocol_version = "2.1";
LIN_language_version = "2.1";
LIN_speed = 19.2 kbps;

Nodes {
    Master: Gateway, 5 ms, 0.1 ms;
    Slaves: ECU1, ECU2;
}

Signals {
    DoorOpen: 1, 0, ECU1, Gateway;
    Temperature: 8, 0x28, ECU2, Gateway, ECU1;
}

Diagnostic_signals {
    MasterReqB0: 8, 0;
}

Frames {
    DoorStatus: 0x01, ECU1, 1 {
        DoorOpen, 0;
    }
    Climate: 0x02, ECU2, 2 {
        Temperature, 0;
    }
}

Schedule_tables {
    Normal {
        DoorStatus delay 10 ms;
        Climate delay 10 ms;
    }
}
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ldf_file(content: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn test_empty_edits_round_trip() -> anyhow::Result<()> {
    init_logging();
    let file = ldf_file(BODY_LDF)?;
    let editor = Editor::new();

    let original = editor.load(file.path())?;
    let report = editor.edit(file.path(), &[], &[])?;
    assert_eq!(report.created + report.updated + report.deleted, 0);

    let reparsed = editor.load(file.path())?;
    assert_eq!(reparsed, original);

    // Comments are gone, unmodelled sections survive verbatim
    let text = std::fs::read_to_string(file.path())?;
    assert!(!text.contains("// Body cluster"));
    assert!(text.contains("Schedule_tables {\n    Normal {\n        DoorStatus delay 10 ms;"));
    assert!(text.contains("Diagnostic_signals {\n    MasterReqB0: 8, 0;\n}"));
    Ok(())
}

#[test]
fn test_create_signal_and_frame() -> anyhow::Result<()> {
    init_logging();
    let file = ldf_file(BODY_LDF)?;
    let editor = Editor::new();

    let report = editor.edit(
        file.path(),
        &[SignalEdit::create("EngineSpeed", 16)
            .with_init_value(InitValue::Scalar(0))
            .with_publisher("ECU1")
            .with_subscribers(["Gateway"])],
        &[FrameEdit::create("StatusFrame", 0x10, 8)
            .with_publisher("ECU1")
            .with_signal("EngineSpeed", 0)],
    )?;
    assert_eq!(report.created, 2);
    assert!(report.diagnostics.is_empty());

    let doc = editor.load(file.path())?;
    let signal = doc.signal("EngineSpeed").expect("signal written");
    assert_eq!(signal.width, 16);
    assert_eq!(signal.publisher.as_deref(), Some("ECU1"));
    let frame = doc.frame("StatusFrame").expect("frame written");
    assert_eq!(frame.frame_id, 0x10);
    assert_eq!(frame.signals.get(&0).map(String::as_str), Some("EngineSpeed"));
    Ok(())
}

#[test]
fn test_failed_edit_leaves_file_untouched() -> anyhow::Result<()> {
    init_logging();
    let file = ldf_file(BODY_LDF)?;
    let editor = Editor::new();

    let err = editor
        .edit(
            file.path(),
            &[SignalEdit::create("EngineSpeed", 16).with_publisher("ECU1")],
            &[FrameEdit::create("StatusFrame", 0x10, 1)
                .with_publisher("ECU1")
                .with_signal("EngineSpeed", 0)],
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RangeError);
    assert_eq!(std::fs::read_to_string(file.path())?, BODY_LDF);
    Ok(())
}

#[test]
fn test_delete_cascades_out_of_frames() -> anyhow::Result<()> {
    init_logging();
    let file = ldf_file(BODY_LDF)?;
    let editor = Editor::new();

    let report = editor.edit(
        file.path(),
        &[SignalEdit::delete("Temperature"), SignalEdit::delete("NoSuchSignal")],
        &[FrameEdit::delete("NoSuchFrame")],
    )?;
    assert_eq!(report.deleted, 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert!(report.diagnostics[0].message.contains("Climate"));

    let doc = editor.load(file.path())?;
    assert!(doc.signal("Temperature").is_none());
    assert!(doc.frame("Climate").expect("frame kept").signals.is_empty());
    Ok(())
}

#[test]
fn test_parse_error_aborts_before_mutation() -> anyhow::Result<()> {
    init_logging();
    let broken = "LIN_description_file;\nSignals {\n";
    let file = ldf_file(broken)?;

    let err = Editor::new()
        .edit(file.path(), &[SignalEdit::delete("DoorOpen")], &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseError);
    assert_eq!(std::fs::read_to_string(file.path())?, broken);
    Ok(())
}

/// Emitter that always fails, to exercise the commit boundary
struct FailingEmitter;

impl LdfEmitter for FailingEmitter {
    fn emit(&self, _doc: &LdfDocument) -> ldf_editor::Result<String> {
        Err(LdfError::InternalError("emitter unavailable".to_string()))
    }
}

#[test]
fn test_emitter_failure_leaves_file_untouched() -> anyhow::Result<()> {
    init_logging();
    let file = ldf_file(BODY_LDF)?;
    let editor =
        Editor::with_collaborators(TextParser::new(), FailingEmitter, EditorConfig::default());

    let err = editor
        .edit(file.path(), &[SignalEdit::delete("DoorOpen")], &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InternalError);
    assert_eq!(std::fs::read_to_string(file.path())?, BODY_LDF);

    let response = Dispatcher::new(editor).handle(
        "save",
        serde_json::json!({ "path": file.path(), "data": { "signals": [] } }),
    );
    assert!(!response.is_ok());
    assert!(response.traceback.is_some());
    Ok(())
}

#[test]
fn test_dispatcher_parse_and_save() -> anyhow::Result<()> {
    init_logging();
    let file = ldf_file(BODY_LDF)?;
    let dispatcher = Dispatcher::new(Editor::new());
    let path = file.path().to_string_lossy().to_string();

    let parsed = dispatcher.handle_json(&serde_json::json!({
        "command": "parse",
        "args": { "path": path }
    }).to_string());
    assert!(parsed.is_ok());
    let data = parsed.data.expect("document summary");
    assert_eq!(data["nodes"]["master"]["name"], "Gateway");
    assert_eq!(data["signals"][1]["init_value"], 40);
    assert_eq!(data["frames"][1]["signals"][0]["signal"], "Temperature");

    let saved = dispatcher.handle_json(&serde_json::json!({
        "command": "save",
        "args": {
            "path": path,
            "data": {
                "signals": [
                    { "_action": "create", "name": "Light", "width": 2, "init_value": 0,
                      "publisher": "Gateway", "subscribers": ["ECU1", "ECU9"] },
                    { "_action": "update", "name": "DoorOpen", "init_value": 1 }
                ],
                "frames": [
                    { "_action": "update", "name": "DoorStatus", "frame_id": 1, "length": 1,
                      "publisher": "ECU1",
                      "signals": [ { "signal": "DoorOpen", "offset": 0 },
                                   { "signal": "Light", "offset": 1 } ] }
                ]
            }
        }
    }).to_string());
    assert!(saved.is_ok(), "save failed: {:?}", saved.message);
    assert_eq!(saved.message.as_deref(), Some("LDF file saved successfully"));
    assert_eq!(saved.warnings.len(), 1);
    assert!(saved.warnings[0].message.contains("ECU9"));

    let doc = Editor::new().load(file.path())?;
    assert_eq!(doc.signal("DoorOpen").expect("kept").init_value, InitValue::Scalar(1));
    assert_eq!(doc.frame("DoorStatus").expect("kept").signals.len(), 2);
    Ok(())
}

#[test]
fn test_dispatcher_reports_duplicate_name() -> anyhow::Result<()> {
    init_logging();
    let file = ldf_file(BODY_LDF)?;
    let response = Dispatcher::new(Editor::new()).handle(
        "save",
        serde_json::json!({
            "path": file.path(),
            "data": { "signals": [ { "action": "create", "name": "DoorOpen", "width": 1 } ] }
        }),
    );
    assert!(!response.is_ok());
    assert_eq!(response.kind, Some(ErrorKind::DuplicateName));
    assert!(response.message.expect("message").starts_with("Failed to save LDF: "));
    assert!(response.traceback.is_none());
    assert_eq!(std::fs::read_to_string(file.path())?, BODY_LDF);
    Ok(())
}

#[test]
fn test_dispatcher_rejects_unknown_publisher() -> anyhow::Result<()> {
    init_logging();
    let file = ldf_file(BODY_LDF)?;
    let dispatcher = Dispatcher::new(Editor::new());

    for signal in [
        serde_json::json!({ "action": "create", "name": "New", "width": 4, "publisher": "ECU9" }),
        serde_json::json!({ "action": "update", "name": "DoorOpen", "publisher": "ECU9" }),
    ] {
        let response = dispatcher.handle(
            "save",
            serde_json::json!({ "path": file.path(), "data": { "signals": [signal] } }),
        );
        assert!(!response.is_ok());
        assert_eq!(response.kind, Some(ErrorKind::ValidationError));
        assert!(response.message.expect("message").contains("ECU9"));
        assert!(response.traceback.is_none());
        assert_eq!(std::fs::read_to_string(file.path())?, BODY_LDF);
    }

    let doc = Editor::new().load(file.path())?;
    assert_eq!(doc.signal("DoorOpen").expect("kept").publisher.as_deref(), Some("ECU1"));
    Ok(())
}

#[test]
fn test_failed_save_still_reports_warnings() -> anyhow::Result<()> {
    init_logging();
    let file = ldf_file(BODY_LDF)?;
    let response = Dispatcher::new(Editor::new()).handle(
        "save",
        serde_json::json!({
            "path": file.path(),
            "data": {
                "signals": [
                    { "action": "create", "name": "Lamp", "width": 1,
                      "publisher": "Gateway", "subscribers": ["ECU7"] },
                    { "action": "create", "name": "Wide", "width": 40 }
                ]
            }
        }),
    );
    assert!(!response.is_ok());
    assert_eq!(response.kind, Some(ErrorKind::RangeError));
    assert_eq!(response.warnings.len(), 1);
    assert!(response.warnings[0].message.contains("ECU7"));
    assert_eq!(std::fs::read_to_string(file.path())?, BODY_LDF);
    Ok(())
}
