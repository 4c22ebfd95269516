//! Shared integration test helpers for field-upload.
//!
//! This module provides a canonical test page (bus, field registry,
//! controller and scripted transport wired together) plus factories for
//! selections and server results.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{TestPage, selection, stored};
//! ```
//!
//! The `#[allow(dead_code)]` attribute suppresses warnings when only a subset
//! of helpers are used per file.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use field_upload::bus::file_upload::FileUploadEvent;
use field_upload::bus::{BusMessage, EventBus, Subscription, TopicFilter, TopicKind};
use field_upload::field::{FieldHandle, FieldId, FieldModel, FieldRegistry, FormId};
use field_upload::upload::{
    FieldView, ProgressRegistry, ScriptedTransport, SelectedFile, SelectionSource, TransferReport,
    UploadController, UploadSettings,
};
use field_upload_config::Config;
use serde_json::{Value, json};

pub const TEST_NONCE: &str = "test-nonce";

/// One page worth of upload plumbing, with taps on every outbound topic.
pub struct TestPage {
    pub bus: Arc<EventBus>,
    pub registry: Arc<FieldRegistry>,
    pub controller: UploadController,
    pub transport: ScriptedTransport,
    pub fields_tap: Arc<Subscription>,
    pub forms_tap: Arc<Subscription>,
    pub alerts_tap: Arc<Subscription>,
    pub t0: Instant,
}

impl TestPage {
    pub fn new() -> Self {
        Self::with_config(&Config::default().with_nonce(TEST_NONCE))
    }

    pub fn with_config(config: &Config) -> Self {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(FieldRegistry::new());
        let controller = UploadController::new(
            UploadSettings::from(config),
            Arc::clone(&bus),
            registry.clone(),
            ProgressRegistry::new(),
        );
        Self {
            fields_tap: bus.subscribe(TopicFilter::kind(TopicKind::Fields)),
            forms_tap: bus.subscribe(TopicFilter::kind(TopicKind::Form)),
            alerts_tap: bus.subscribe(TopicFilter::kind(TopicKind::Alerts)),
            bus,
            registry,
            controller,
            transport: ScriptedTransport::new(),
            t0: Instant::now(),
        }
    }

    /// Register, initialize and render a field.
    pub fn add_field(&mut self, model: FieldModel) -> FieldHandle {
        self.add_field_with_view(model, |view| view)
    }

    pub fn add_field_with_view(
        &mut self,
        model: FieldModel,
        customize: impl FnOnce(FieldView) -> FieldView,
    ) -> FieldHandle {
        let handle = self.registry.insert(model);
        self.controller
            .handle(FileUploadEvent::InitModel(Arc::clone(&handle)), &mut self.transport);
        let view = customize(FieldView::new(Arc::clone(&handle)));
        self.controller
            .handle(FileUploadEvent::RenderView(view), &mut self.transport);
        handle
    }

    /// Pick `files` for `field` and let the transfer finish with `response`.
    pub fn upload(
        &mut self,
        field: FieldId,
        files: Vec<SelectedFile>,
        response: Option<Value>,
    ) -> TransferReport {
        self.transport.upload(
            &mut self.controller,
            field,
            SelectionSource::Picker,
            files,
            response,
            self.t0,
        )
    }

    /// Names in the field's collection, in order.
    pub fn file_names(&self, field: &FieldHandle) -> Vec<String> {
        field
            .lock()
            .files
            .as_ref()
            .map(|files| files.records().iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn after(&self, ms: u64) -> Instant {
        self.t0 + Duration::from_millis(ms)
    }

    /// Discard everything published so far.
    pub fn clear_taps(&self) {
        self.fields_tap.drain();
        self.forms_tap.drain();
        self.alerts_tap.drain();
        self.bus.take_journal();
    }
}

pub fn field(id: u64, form: u64) -> FieldModel {
    FieldModel::new(FieldId(id), FormId(form))
}

/// A selection of 1 KiB files.
pub fn selection(names: &[&str]) -> Vec<SelectedFile> {
    names.iter().map(|n| SelectedFile::new(*n, 1024)).collect()
}

/// A successful server result storing `files` as `(name, tmp_name)`.
pub fn stored(files: &[(&str, &str)]) -> Value {
    stored_with_errors(&[], files)
}

pub fn stored_with_errors(errors: &[&str], files: &[(&str, &str)]) -> Value {
    let files: Vec<Value> = files
        .iter()
        .map(|(name, tmp)| json!({ "name": name, "tmp_name": tmp }))
        .collect();
    json!({ "errors": errors, "data": { "files": files } })
}

/// Every `add:error` message in `messages`.
pub fn added_errors(messages: &[BusMessage]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| match m {
            BusMessage::AddError { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}
