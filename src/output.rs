//! JSON output types for the CLI.
//!
//! Every response carries `status` first and a `schema_version`. Results go
//! to stdout; logs go to stderr.
//!
//! `generate` streams one compact JSON line per [`StageEvent`] and finishes
//! with a pretty-printed [`GenerateResponse`].
//!
//! [`StageEvent`]: crate::progress::StageEvent

use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use tuguml_core::error::{OutputErrorCode, UmlError};

use crate::progress::ProjectId;
use crate::store::ArtifactRef;

/// Current schema version for JSON output.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &UmlError) -> Self {
        let details = match err {
            UmlError::EmptySourceDirectory { path } | UmlError::SourceNotFound { path } => {
                Some(serde_json::json!({ "path": path }))
            }
            UmlError::NotFound { name } => Some(serde_json::json!({ "name": name })),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(err: &UmlError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Command Responses
// ============================================================================

/// Final response of `generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub status: String,
    pub schema_version: String,
    pub project: ProjectId,
    /// Directory holding the project's artifacts.
    pub out_dir: PathBuf,
    pub types: usize,
    pub externals: usize,
    pub artifacts: Vec<ArtifactRef>,
}

impl GenerateResponse {
    pub fn new(
        project: ProjectId,
        out_dir: PathBuf,
        types: usize,
        externals: usize,
        artifacts: Vec<ArtifactRef>,
    ) -> Self {
        GenerateResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            project,
            out_dir,
            types,
            externals,
            artifacts,
        }
    }
}

/// Response of `delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub schema_version: String,
    pub project: ProjectId,
    pub removed: usize,
}

impl DeleteResponse {
    pub fn new(project: ProjectId, removed: usize) -> Self {
        DeleteResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            project,
            removed,
        }
    }
}

// ============================================================================
// Emitters
// ============================================================================

/// Emit a response as pretty-printed JSON.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a value as one compact JSON line.
pub fn emit_json_line<T: Serialize>(value: &T, writer: &mut impl Write) -> io::Result<()> {
    let json =
        serde_json::to_string(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{Stage, StageEvent};

    #[test]
    fn error_response_shape() {
        let err = UmlError::EmptySourceDirectory {
            path: "/work/empty".to_string(),
        };
        let mut out = Vec::new();
        emit_response(&ErrorResponse::new(&err), &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["error"]["code"], 2);
        assert_eq!(json["error"]["details"]["path"], "/work/empty");
    }

    #[test]
    fn error_without_details_omits_field() {
        let info = ErrorInfo::from_error(&UmlError::internal("boom"));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["code"], 10);
        assert!(json.get("details").is_none());
    }

    #[test]
    fn events_are_single_lines() {
        let id = ProjectId::new("shop").unwrap();
        let mut out = Vec::new();
        emit_json_line(&StageEvent::progress(&id, Stage::Uml, 0), &mut out).unwrap();
        emit_json_line(&StageEvent::error(&id, Stage::Uml, "bad\nthing"), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "progress");
        assert_eq!(first["stage"], "uml");
        assert_eq!(first["percent"], 0);
    }

    #[test]
    fn delete_response_fields() {
        let response = DeleteResponse::new(ProjectId::new("shop").unwrap(), 3);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["project"], "shop");
        assert_eq!(json["removed"], 3);
    }
}
