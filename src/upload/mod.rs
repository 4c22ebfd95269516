//! Upload lifecycle: limit gate, transfer tracking, result handling.
//!
//! [`UploadController`] is the entry point. It reacts to `file_upload` bus
//! traffic and to transport callbacks, and keeps per-field state in
//! [`FieldSession`]s. Progress bars live in a [`ProgressRegistry`] the
//! controller owns.

mod controller;
mod error;
mod limits;
mod progress;
mod result;
mod scripted;
mod state;
mod transport;

pub use controller::{UploadController, UploadSettings};
pub use error::UploadError;
pub use limits::FileLimit;
pub use progress::{ProgressIndicator, ProgressRegistry, percent_of};
pub use result::{FAILURE_SENTINEL, StoredFile, TransferResult, UploadResponse, UploadResponseData};
pub use scripted::{ScriptedTransport, SelectionSource, TransferReport};
pub use state::{BatchId, BatchOutcome, ControlState, FieldSession, UploadState};
pub use transport::{
    DomContext, FieldView, HookDecision, SelectedFile, TransferEvent, TransportFormData,
    TransportMessages, TransportOptions, UploadTransport,
};
