//! Interpretation of the server's answer to a completed transfer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server failure sentinel.
pub const FAILURE_SENTINEL: i64 = -1;

/// One file the server stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub name: String,
    pub tmp_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponseData {
    #[serde(default)]
    pub files: Option<Vec<StoredFile>>,
}

/// The structured success body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Per-file error messages
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub data: UploadResponseData,
}

impl UploadResponse {
    /// Stored files, treating an absent list as empty.
    pub fn stored_files(&self) -> &[StoredFile] {
        self.data.files.as_deref().unwrap_or(&[])
    }
}

/// What a finished transfer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    /// No result, a falsy value, or a body that is not an object
    Missing,
    /// The server's failure sentinel
    Rejected,
    /// A structured body (which may still carry per-file errors)
    Completed(UploadResponse),
}

impl TransferResult {
    /// Classify a raw JSON result.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(value) = value else {
            return TransferResult::Missing;
        };
        if is_falsy(value) {
            return TransferResult::Missing;
        }
        if value.as_i64() == Some(FAILURE_SENTINEL) {
            return TransferResult::Rejected;
        }
        if !value.is_object() {
            log::warn!("Upload result is not an object: {value}");
            return TransferResult::Missing;
        }
        TransferResult::Completed(UploadResponse {
            errors: decode_errors(value.get("errors")),
            data: UploadResponseData {
                files: value.pointer("/data/files").and_then(decode_files),
            },
        })
    }

    /// Convenience constructor for a successful body.
    pub fn completed(errors: Vec<String>, files: Vec<StoredFile>) -> Self {
        TransferResult::Completed(UploadResponse {
            errors,
            data: UploadResponseData { files: Some(files) },
        })
    }
}

/// Error messages from the body; entries that are not strings are rendered as JSON.
fn decode_errors(errors: Option<&Value>) -> Vec<String> {
    match errors {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(message)) => vec![message.clone()],
        Some(Value::Array(entries)) => entries
            .iter()
            .filter(|entry| !entry.is_null())
            .map(|entry| match entry {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(other) => {
            log::warn!("Ignoring malformed upload errors: {other}");
            Vec::new()
        }
    }
}

/// Stored files from the body, skipping entries that do not decode.
fn decode_files(files: &Value) -> Option<Vec<StoredFile>> {
    let Value::Array(entries) = files else {
        if !files.is_null() {
            log::warn!("Ignoring malformed stored file list: {files}");
        }
        return None;
    };
    let stored = entries
        .iter()
        .filter_map(|entry| match StoredFile::deserialize(entry) {
            Ok(file) => Some(file),
            Err(e) => {
                log::warn!("Skipping malformed stored file ({e}): {entry}");
                None
            }
        })
        .collect();
    Some(stored)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
