//! Field models, their file collections, and the field registry.
//!
//! - `files`:       `FileRecord` / `FileCollection`
//! - `initializer`: `init:model` handling (raw config → upload-ready model)
//! - `mod`:         ids, `FieldModel`, `FieldRegistry` (`get:field`)

mod files;
mod initializer;

pub use files::{FileCollection, FileRecord, FileRecordData};
pub use initializer::FieldInitializer;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of one form field.
///
/// Fields are always looked up associatively, so sparse ids are fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the form owning a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(pub u64);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The host's model of one file-upload field.
///
/// Deserializes from the raw field configuration the host page provides.
/// `upload_multi`, `upload_nonce` and `files` are filled in by
/// [`FieldInitializer`].
#[derive(Debug, Clone, Deserialize)]
pub struct FieldModel {
    pub id: FieldId,

    #[serde(rename = "formID")]
    pub form_id: FormId,

    /// 1 = single-file mode, >1 = multi-file cap, absent or 0 = unlimited.
    #[serde(default, deserialize_with = "lenient::opt_u32")]
    pub upload_multi_count: Option<u32>,

    /// Per-file byte cap handed to the transport
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub max_file_size: Option<u64>,

    /// Human-readable size cap used in the max-file-size message
    #[serde(default, deserialize_with = "lenient::opt_label")]
    pub max_file_size_mb: Option<String>,

    /// Generic "has content" value consulted by required-field checks
    #[serde(default)]
    pub value: serde_json::Value,

    /// Draft records present in the raw config, consumed at initialization
    #[serde(default, rename = "files")]
    pub draft_files: Option<Vec<FileRecordData>>,

    /// Normalized collection; `None` until the field is initialized
    #[serde(skip)]
    pub files: Option<FileCollection>,

    /// Derived from `upload_multi_count` once, at initialization.
    ///
    /// Not re-derived if `upload_multi_count` changes later.
    #[serde(skip)]
    pub upload_multi: bool,

    #[serde(skip)]
    pub upload_nonce: Option<String>,

    #[serde(skip)]
    files_signal: u64,
}

impl FieldModel {
    /// A bare model, as the host would create before `init:model`.
    pub fn new(id: FieldId, form_id: FormId) -> Self {
        Self {
            id,
            form_id,
            upload_multi_count: None,
            max_file_size: None,
            max_file_size_mb: None,
            value: serde_json::Value::Null,
            draft_files: None,
            files: None,
            upload_multi: false,
            upload_nonce: None,
            files_signal: 0,
        }
    }

    pub fn with_upload_multi_count(mut self, count: u32) -> Self {
        self.upload_multi_count = Some(count);
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64, label_mb: impl Into<String>) -> Self {
        self.max_file_size = Some(bytes);
        self.max_file_size_mb = Some(label_mb.into());
        self
    }

    pub fn with_draft_files(mut self, files: Vec<FileRecordData>) -> Self {
        self.draft_files = Some(files);
        self
    }

    /// Parse a raw field configuration object.
    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Single-file mode replaces the collection on every new selection.
    pub fn is_single_file(&self) -> bool {
        self.upload_multi_count == Some(1)
    }

    /// Fire the "files changed" signal.
    pub fn trigger_files_changed(&mut self) {
        self.files_signal += 1;
    }

    /// Number of times the "files changed" signal has fired.
    pub fn files_signal(&self) -> u64 {
        self.files_signal
    }

    /// Whether the generic value is set to something truthy.
    pub fn has_value(&self) -> bool {
        match &self.value {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            serde_json::Value::String(s) => !s.is_empty(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
        }
    }
}

/// Shared handle to a field model.
pub type FieldHandle = Arc<Mutex<FieldModel>>;

/// Answers `get:field` requests.
pub trait FieldDirectory: Send + Sync {
    fn get_field(&self, id: FieldId) -> Option<FieldHandle>;
}

/// The host's field registry.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: RwLock<HashMap<FieldId, FieldHandle>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model and return its shared handle.
    ///
    /// Replaces any previous model with the same id.
    pub fn insert(&self, model: FieldModel) -> FieldHandle {
        let id = model.id;
        let handle = Arc::new(Mutex::new(model));
        if self.fields.write().insert(id, Arc::clone(&handle)).is_some() {
            log::warn!("Field {} registered twice; previous model replaced", id);
        }
        handle
    }

    pub fn remove(&self, id: FieldId) -> Option<FieldHandle> {
        self.fields.write().remove(&id)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<FieldId> {
        let mut ids: Vec<FieldId> = self.fields.read().keys().copied().collect();
        ids.sort();
        ids
    }
}

impl FieldDirectory for FieldRegistry {
    fn get_field(&self, id: FieldId) -> Option<FieldHandle> {
        self.fields.read().get(&id).cloned()
    }
}

/// Permissive deserializers for numeric attributes that hosts send either as
/// numbers or as numeric strings.
mod lenient {
    use super::*;
    use serde_json::Value;

    fn to_u64(value: &Value) -> Option<u64> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64),
            _ => None,
        }
    }

    pub fn opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(to_u64(&value))
    }

    pub fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(to_u64(&value).map(|n| u32::try_from(n).unwrap_or(u32::MAX)))
    }

    pub fn opt_field_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<FieldId>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(to_u64(&value).map(FieldId))
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Null => String::new(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    pub fn opt_label<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }
}
