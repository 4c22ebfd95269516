//! Inbound traffic on the `file_upload` channel.
//!
//! These carry live handles (field models, file records) rather than
//! serializable payloads, so they are dispatched directly to the controller
//! instead of being journaled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Map, Value};

use crate::field::{FieldHandle, FileRecord};
use crate::upload::{DomContext, FieldView};

/// A user-interface event whose default action can be suppressed.
///
/// Clones share the same flag, so the host can inspect it after dispatch.
#[derive(Debug, Clone, Default)]
pub struct UiEvent {
    default_prevented: Arc<AtomicBool>,
}

impl UiEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.store(true, Ordering::Relaxed);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.load(Ordering::Relaxed)
    }
}

/// Push-style events the controller subscribes to.
#[derive(Debug, Clone)]
pub enum FileUploadEvent {
    /// `init:model`: a field model was created at form load
    InitModel(FieldHandle),
    /// `render:view`: the field's view exists
    RenderView(FieldView),
    /// `click:deleteFile`: the user clicked delete on one record
    DeleteFile {
        event: UiEvent,
        record: Arc<FileRecord>,
    },
}

/// Request-style queries the controller answers.
#[derive(Debug, Clone)]
pub enum FileUploadRequest {
    /// `validate:required`
    ValidateRequired {
        context: Option<DomContext>,
        field: FieldHandle,
    },
    /// `get:submitData`
    GetSubmitData {
        field_data: Map<String, Value>,
        field: FieldHandle,
    },
}

/// Replies to [`FileUploadRequest`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum FileUploadReply {
    Required(bool),
    SubmitData(Map<String, Value>),
}
