//! Command dispatcher
//!
//! Maps host requests (`parse`, `save`) onto the [`Editor`] and turns every
//! outcome, success or failure, into a [`Response`] envelope. Nothing above
//! this layer sees an `LdfError`.

use crate::editor::Editor;
use crate::formats::{LdfEmitter, LdfParser};
use crate::mutation::{Diagnostic, EditReport, FrameEdit, SignalEdit};
use crate::types::{ErrorKind, LdfError};
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::path::{Path, PathBuf};

/// Request envelope from the host
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Request {
    pub command: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Arguments of the `parse` command
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParseArgs {
    pub path: String,
}

/// Arguments of the `save` command
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SaveArgs {
    pub path: String,
    #[serde(default)]
    pub data: SaveData,
}

/// Edit batches carried by a `save` request
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SaveData {
    #[serde(default)]
    pub signals: Vec<SignalEdit>,
    #[serde(default)]
    pub frames: Vec<FrameEdit>,
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Response envelope to the host (printed as one line of JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Diagnostic>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            data: None,
            message: None,
            kind: None,
            traceback: None,
            warnings: Vec::new(),
        }
    }

    /// Plain error without a taxonomy kind (bad request shape)
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    /// Error built from a library failure; internal failures carry their chain
    pub fn from_error(prefix: &str, err: &LdfError) -> Self {
        let kind = err.kind();
        let traceback = (kind == ErrorKind::InternalError).then(|| error_chain(err));
        Self {
            kind: Some(kind),
            traceback,
            ..Self::error(format!("{}{}", prefix, err))
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Process exit status for this response
    pub fn exit_code(&self) -> u8 {
        if self.is_ok() {
            0
        } else {
            1
        }
    }

    /// Single-line JSON rendering
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"status":"error","message":"Failed to encode response: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

/// Routes requests to an editor
pub struct Dispatcher<P: LdfParser, E: LdfEmitter> {
    editor: Editor<P, E>,
}

impl<P: LdfParser, E: LdfEmitter> Dispatcher<P, E> {
    pub fn new(editor: Editor<P, E>) -> Self {
        Self { editor }
    }

    /// Handle a raw JSON request string
    pub fn handle_json(&self, input: &str) -> Response {
        match serde_json::from_str::<Request>(input) {
            Ok(request) => self.handle(&request.command, request.args),
            Err(e) => Response::error(format!("Invalid JSON input: {}", e)),
        }
    }

    /// Handle a decoded command
    pub fn handle(&self, command: &str, args: serde_json::Value) -> Response {
        log::debug!("Handling command '{}'", command);
        match command {
            "parse" => match serde_json::from_value::<ParseArgs>(args) {
                Ok(args) => self.parse(&args.path),
                Err(e) => Response::error(format!("Invalid arguments for 'parse': {}", e)),
            },
            "save" => match serde_json::from_value::<SaveArgs>(args) {
                Ok(args) => self.save(&args.path, &args.data),
                Err(e) => Response::error(format!("Invalid arguments for 'save': {}", e)),
            },
            other => Response::error(format!("Unknown command: {}", other)),
        }
    }

    /// Parse a file and return its summary as `data`
    pub fn parse(&self, path: &str) -> Response {
        let path = expand_path(path);
        match self.editor.load(&path) {
            Ok(doc) => match serde_json::to_value(doc.summary()) {
                Ok(data) => Response {
                    data: Some(data),
                    ..Response::ok()
                },
                Err(e) => Response::from_error("", &LdfError::InternalError(e.to_string())),
            },
            Err(e) => {
                log::error!("Parse failed: {}", e);
                Response::from_error("", &e)
            }
        }
    }

    /// Apply edits and overwrite the file
    ///
    /// Diagnostics are returned as `warnings` whether or not the save
    /// succeeded.
    pub fn save(&self, path: &str, data: &SaveData) -> Response {
        let path = expand_path(path);
        let mut report = EditReport::default();
        let response = match self
            .editor
            .edit_with_report(&path, &data.signals, &data.frames, &mut report)
        {
            Ok(()) => Response {
                message: Some("LDF file saved successfully".to_string()),
                ..Response::ok()
            },
            Err(e) => {
                log::error!("Save failed: {}", e);
                Response::from_error("Failed to save LDF: ", &e)
            }
        };
        Response {
            warnings: report.diagnostics,
            ..response
        }
    }
}

/// Expand a leading `~` against `HOME`
fn expand_path(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            if let Some(home) = std::env::var_os("HOME") {
                return Path::new(&home).join(rest.trim_start_matches('/'));
            }
        }
    }
    PathBuf::from(raw)
}

/// Render an error and all of its sources, one per line
fn error_chain(err: &LdfError) -> String {
    let mut out = format!("{:?}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\nCaused by: {}", cause));
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> Dispatcher<crate::formats::TextParser, crate::formats::TextEmitter> {
        Dispatcher::new(Editor::new())
    }

    #[test]
    fn test_unknown_command() {
        let response = dispatcher().handle_json(r#"{"command": "compile", "args": {}}"#);
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.message.as_deref(), Some("Unknown command: compile"));
        assert_eq!(response.exit_code(), 1);
    }

    #[test]
    fn test_invalid_json() {
        let response = dispatcher().handle_json("{not json");
        assert!(!response.is_ok());
        assert!(response.message.unwrap().starts_with("Invalid JSON input"));
    }

    #[test]
    fn test_parse_missing_file() {
        let response = dispatcher().parse("/no/such/file.ldf");
        assert_eq!(response.kind, Some(ErrorKind::NotFound));
        assert!(response.traceback.is_none());
        assert!(response.message.unwrap().contains("/no/such/file.ldf"));
    }

    #[test]
    fn test_save_missing_args() {
        let response = dispatcher().handle("save", serde_json::json!({}));
        assert!(!response.is_ok());
        assert!(response.message.unwrap().contains("'save'"));
    }

    #[test]
    fn test_internal_errors_carry_traceback() {
        let err = LdfError::EditFailed {
            entity: crate::types::EntityKind::Signal,
            index: 0,
            name: "S".to_string(),
            source: Box::new(LdfError::InternalError("boom".to_string())),
        };
        let response = Response::from_error("Failed to save LDF: ", &err);
        assert_eq!(response.kind, Some(ErrorKind::InternalError));
        let traceback = response.traceback.unwrap();
        assert!(traceback.contains("Caused by: Internal error: boom"));
    }

    #[test]
    fn test_response_json_shape() {
        let line = Response::error("bad").to_json_line();
        assert_eq!(line, r#"{"status":"error","message":"bad"}"#);
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_path("~/a.ldf"), Path::new(&home).join("a.ldf"));
        }
        assert_eq!(expand_path("/x/~y.ldf"), PathBuf::from("/x/~y.ldf"));
    }
}
