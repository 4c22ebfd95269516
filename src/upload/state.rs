//! Per-field upload session state.

use std::sync::Arc;

use serde::Serialize;

use super::{TransportOptions, UploadError};
use crate::field::{FieldHandle, FileCollection, FileRecord};
use crate::list_view::FileListView;

/// Identifies one transfer; assigned when the transfer starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BatchId(pub u64);

/// Where a field is in its upload lifecycle.
///
/// Errors are not a state: they are reported alongside and never block a
/// retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// No transfer active
    Idle,
    /// Transient, while a selection is checked against the file limit
    LimitCheck,
    /// A transfer is in flight
    Uploading(BatchId),
}

impl UploadState {
    pub fn is_uploading(&self) -> bool {
        matches!(self, UploadState::Uploading(_))
    }
}

/// Enabled/disabled state of the field's file input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlState {
    pub disabled: bool,
    /// CSS class added to the input's wrapper, if any
    pub wrapper_class: Option<String>,
}

impl ControlState {
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            wrapper_class: Some("disabled".to_string()),
        }
    }
}

/// What one finished transfer did to its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch: Option<BatchId>,
    /// Records appended to the collection, in arrival order
    pub added: Vec<Arc<FileRecord>>,
    /// Errors reported to the error-display subsystem
    pub errors: Vec<UploadError>,
}

/// Everything the controller keeps for one rendered field.
#[derive(Debug)]
pub struct FieldSession {
    pub(crate) model: FieldHandle,
    /// The collection as captured at render time; single-file resets empty
    /// this same collection rather than replacing it
    pub(crate) files: FileCollection,
    pub(crate) list_view: FileListView,
    pub(crate) state: UploadState,
    pub(crate) control: ControlState,
    pub(crate) options: TransportOptions,
    pub(crate) last_outcome: Option<BatchOutcome>,
}

impl FieldSession {
    pub fn model(&self) -> &FieldHandle {
        &self.model
    }

    pub fn files(&self) -> &FileCollection {
        &self.files
    }

    pub fn list_view(&self) -> &FileListView {
        &self.list_view
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn control(&self) -> &ControlState {
        &self.control
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn last_outcome(&self) -> Option<&BatchOutcome> {
        self.last_outcome.as_ref()
    }
}
