//! Boundary with the upload-transport collaborator.
//!
//! The transport does the network work; this crate hands it a declarative
//! [`TransportOptions`] and receives its lifecycle callbacks as
//! [`TransferEvent`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::{FieldHandle, FieldId, FormId};

/// The view-side context an event was raised in.
///
/// `field_wrap` is the id found on the nearest enclosing field wrapper, or
/// `None` when the event target sits outside any field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomContext {
    pub field_wrap: Option<FieldId>,
}

impl DomContext {
    pub fn in_field(field_id: FieldId) -> Self {
        Self {
            field_wrap: Some(field_id),
        }
    }

    /// The owning field id, resolved by walking up to the field wrapper.
    pub fn field_id(&self) -> Option<FieldId> {
        self.field_wrap
    }
}

/// A rendered field view, as delivered with `render:view`.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub model: FieldHandle,
    /// Value of the view's hidden nonce input, if the template rendered one
    pub nonce: Option<String>,
    /// Whether the environment supports native file inputs
    pub file_input_supported: bool,
}

impl FieldView {
    pub fn new(model: FieldHandle) -> Self {
        Self {
            model,
            nonce: None,
            file_input_supported: true,
        }
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn without_file_input(mut self) -> Self {
        self.file_input_supported = false;
        self
    }
}

/// A file picked or dropped by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    /// Set by the transport's processing step when the file is invalid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportFormData {
    pub form_id: FormId,
    pub field_id: FieldId,
    pub nonce: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportMessages {
    pub max_file_size: String,
}

/// Declarative configuration handed to the transport for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportOptions {
    /// Destination endpoint
    pub url: String,
    /// Expected response format
    pub data_type: String,
    /// Extra form fields sent with every request
    pub form_data: TransportFormData,
    pub messages: TransportMessages,
    /// `false`: a batch is sent together in one request
    pub single_file_uploads: bool,
    /// Per-file byte cap enforced by the transport's processing step
    pub max_file_size: Option<u64>,
}

/// Lifecycle callbacks raised by the transport for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// Files chosen through the file input
    Change { files: Vec<SelectedFile> },
    /// Files dropped onto the control
    Drop { files: Vec<SelectedFile> },
    /// The transfer is about to begin
    Start,
    /// Aggregate progress over the whole batch
    ProgressAll {
        context: DomContext,
        loaded: u64,
        total: u64,
    },
    /// The processing step for `files[index]` finished
    ProcessAlways {
        files: Vec<SelectedFile>,
        index: usize,
    },
    /// The transfer finished; `result` is the raw parsed response
    Done {
        context: DomContext,
        result: Option<Value>,
    },
}

impl TransferEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TransferEvent::Change { .. } => "change",
            TransferEvent::Drop { .. } => "drop",
            TransferEvent::Start => "start",
            TransferEvent::ProgressAll { .. } => "progressall",
            TransferEvent::ProcessAlways { .. } => "processalways",
            TransferEvent::Done { .. } => "done",
        }
    }
}

/// The controller's answer to a lifecycle callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    Proceed,
    /// Cancel the transfer before any network activity
    Abort(super::UploadError),
}

impl HookDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, HookDecision::Proceed)
    }
}

/// The transport collaborator's side of the contract.
pub trait UploadTransport {
    /// Bind the transport to a field's file input.
    fn attach(&mut self, field_id: FieldId, options: TransportOptions);

    /// Disable the file input (feature gate).
    fn disable(&mut self, field_id: FieldId);
}
