//! The upload lifecycle controller.
//!
//! Owns every rendered field's [`FieldSession`], turns transport callbacks
//! into state transitions and collection updates, and coordinates with the
//! validation, error-display and submit-gating subsystems over the bus.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use field_upload_config::{Config, UploadStrings};
use serde_json::{Map, Value};

use super::limits::FileLimit;
use super::progress::{ProgressRegistry, percent_of};
use super::result::TransferResult;
use super::state::{BatchId, BatchOutcome, ControlState, FieldSession, UploadState};
use super::transport::{
    DomContext, FieldView, HookDecision, SelectedFile, TransferEvent, TransportFormData,
    TransportMessages, TransportOptions, UploadTransport,
};
use super::UploadError;
use crate::bus::file_upload::{FileUploadEvent, FileUploadReply, FileUploadRequest, UiEvent};
use crate::bus::{BusMessage, EventBus, Topic, TopicKind, UPLOAD_ERROR_TAG, Wiring};
use crate::field::{
    FieldDirectory, FieldId, FieldInitializer, FieldModel, FileCollection, FileRecord,
};
use crate::list_view::FileListView;

/// Settings the controller needs from the process-wide configuration.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub upload_url: String,
    pub nonce: String,
    pub strings: UploadStrings,
    pub progress_reset_delay: Duration,
}

impl From<&Config> for UploadSettings {
    fn from(config: &Config) -> Self {
        Self {
            upload_url: config.upload_url(),
            nonce: config.nonces.file_upload.clone(),
            strings: config.strings.clone(),
            progress_reset_delay: Duration::from_millis(config.progress_reset_delay_ms),
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

pub struct UploadController {
    settings: UploadSettings,
    initializer: FieldInitializer,
    bus: Arc<EventBus>,
    fields: Arc<dyn FieldDirectory>,
    progress: ProgressRegistry,
    sessions: HashMap<FieldId, FieldSession>,
    next_batch: u64,
}

impl std::fmt::Debug for UploadController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadController")
            .field("settings", &self.settings)
            .field("sessions", &self.sessions.len())
            .field("progress", &self.progress)
            .finish()
    }
}

impl UploadController {
    /// Bus usage of the controller.
    pub const WIRING: Wiring = Wiring {
        component: "upload-controller",
        subscribes: &[TopicKind::FileUpload],
        publishes: &[TopicKind::Fields, TopicKind::Form, TopicKind::Alerts],
    };

    pub fn new(
        settings: UploadSettings,
        bus: Arc<EventBus>,
        fields: Arc<dyn FieldDirectory>,
        progress: ProgressRegistry,
    ) -> Self {
        let initializer = FieldInitializer::new(settings.nonce.clone());
        Self {
            settings,
            initializer,
            bus,
            fields,
            progress,
            sessions: HashMap::new(),
            next_batch: 1,
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    pub fn progress(&self) -> &ProgressRegistry {
        &self.progress
    }

    pub fn session(&self, field_id: FieldId) -> Option<&FieldSession> {
        self.sessions.get(&field_id)
    }

    /// Current lifecycle state; `None` for fields that were never rendered.
    pub fn state(&self, field_id: FieldId) -> Option<UploadState> {
        self.sessions.get(&field_id).map(|s| s.state)
    }

    // ------------------------------------------------------------------
    // file_upload channel
    // ------------------------------------------------------------------

    /// Dispatch an inbound `file_upload` event.
    pub fn handle(&mut self, event: FileUploadEvent, transport: &mut dyn UploadTransport) {
        match event {
            FileUploadEvent::InitModel(handle) => self.init_model(&mut handle.lock()),
            FileUploadEvent::RenderView(view) => {
                self.render_view(view, transport);
            }
            FileUploadEvent::DeleteFile { event, record } => self.delete_file(&event, &record),
        }
    }

    /// Answer a request on the `file_upload` channel.
    pub fn reply(&self, request: FileUploadRequest) -> FileUploadReply {
        match request {
            FileUploadRequest::ValidateRequired { field, .. } => {
                FileUploadReply::Required(Self::validate_required(&field.lock()))
            }
            FileUploadRequest::GetSubmitData { field_data, field } => {
                FileUploadReply::SubmitData(Self::get_submit_data(field_data, &field.lock()))
            }
        }
    }

    /// `init:model`
    pub fn init_model(&self, model: &mut FieldModel) {
        self.initializer.init_model(model);
    }

    /// `render:view`: register the progress bar and list binding, hand the
    /// transport its configuration, and apply the file-input feature gate.
    pub fn render_view(
        &mut self,
        view: FieldView,
        transport: &mut dyn UploadTransport,
    ) -> TransportOptions {
        let (field_id, form_id, files, options) = {
            let mut model = view.model.lock();
            let files = match &model.files {
                Some(files) => files.clone(),
                None => {
                    log::warn!(
                        "Field {} rendered before init:model; starting with no files",
                        model.id
                    );
                    let files = FileCollection::new(model.id);
                    model.files = Some(files.clone());
                    files
                }
            };
            let nonce = view
                .nonce
                .clone()
                .or_else(|| model.upload_nonce.clone())
                .unwrap_or_else(|| self.settings.nonce.clone());
            let options = TransportOptions {
                url: self.settings.upload_url.clone(),
                data_type: "json".to_string(),
                form_data: TransportFormData {
                    form_id: model.form_id,
                    field_id: model.id,
                    nonce,
                },
                messages: TransportMessages {
                    max_file_size: self
                        .settings
                        .strings
                        .format_max_file_size(model.max_file_size_mb.as_deref().unwrap_or("")),
                },
                single_file_uploads: false,
                max_file_size: model.max_file_size,
            };
            (model.id, model.form_id, files, options)
        };

        // Registered before the transport is attached so an early progress
        // event always finds its bar
        self.progress.register(field_id);

        let control = if view.file_input_supported {
            ControlState::default()
        } else {
            log::warn!("File input unsupported; upload control for field {field_id} disabled");
            ControlState::disabled()
        };

        transport.attach(field_id, options.clone());
        if control.disabled {
            transport.disable(field_id);
        }

        crate::debug_info!(
            "UPLOAD",
            "render field {} (form {}) -> {}",
            field_id,
            form_id,
            options.url
        );

        let session = FieldSession {
            model: Arc::clone(&view.model),
            list_view: FileListView::new(files.clone()),
            files,
            state: UploadState::Idle,
            control,
            options: options.clone(),
            last_outcome: None,
        };
        if self.sessions.insert(field_id, session).is_some() {
            log::debug!("Field {field_id} re-rendered; previous session replaced");
        }
        options
    }

    /// Forget a field whose view was torn down.
    pub fn teardown(&mut self, field_id: FieldId) {
        self.sessions.remove(&field_id);
        self.progress.unregister(field_id);
    }

    /// `click:deleteFile`
    ///
    /// Removes exactly `record` and announces the change. Server-side
    /// temporary files are not revoked here.
    pub fn delete_file(&mut self, event: &UiEvent, record: &Arc<FileRecord>) {
        event.prevent_default();

        let Some(field) = self.fields.get_field(record.field_id) else {
            log::warn!(
                "Delete for {:?} ignored: field {} is not registered",
                record.name,
                record.field_id
            );
            return;
        };

        let files = field.lock().files.clone();
        match files {
            Some(files) if files.remove(record) => {
                crate::debug_info!("UPLOAD", "deleted {:?} from field {}", record.name, record.field_id);
            }
            _ => log::warn!(
                "Delete for {:?}: record not in field {}",
                record.name,
                record.field_id
            ),
        }

        if let Some(session) = self.sessions.get_mut(&record.field_id) {
            session.list_view.sync();
        }

        self.publish(
            Topic::Fields,
            BusMessage::ChangeField {
                field_id: record.field_id,
                context: None,
            },
        );
    }

    /// `validate:required`: satisfied once the field holds at least one file.
    pub fn validate_required(model: &FieldModel) -> bool {
        model.files.as_ref().is_some_and(|files| !files.is_empty())
    }

    /// `get:submitData`: attach the field's files under `files`.
    ///
    /// An uninitialized field contributes nothing.
    pub fn get_submit_data(mut field_data: Map<String, Value>, model: &FieldModel) -> Map<String, Value> {
        if let Some(files) = &model.files {
            field_data.insert("files".to_string(), files.to_json());
        }
        field_data
    }

    // ------------------------------------------------------------------
    // Transport lifecycle
    // ------------------------------------------------------------------

    /// Handle one transport callback for `field_id`.
    pub fn on_transfer(&mut self, field_id: FieldId, event: TransferEvent, now: Instant) -> HookDecision {
        crate::debug_trace!("UPLOAD", "field {} hook {}", field_id, event.name());
        match event {
            TransferEvent::Change { files } | TransferEvent::Drop { files } => {
                self.check_files_limit(field_id, &files)
            }
            TransferEvent::Start => self.start(field_id),
            TransferEvent::ProgressAll {
                context,
                loaded,
                total,
            } => {
                self.update_progress(&context, loaded, total);
                HookDecision::Proceed
            }
            TransferEvent::ProcessAlways { files, index } => {
                self.process_always(field_id, &files, index);
                HookDecision::Proceed
            }
            TransferEvent::Done { context, result } => {
                self.done(field_id, &context, result.as_ref(), now);
                HookDecision::Proceed
            }
        }
    }

    /// Clear progress bars whose reset delay has elapsed.
    pub fn tick(&mut self, now: Instant) -> Vec<FieldId> {
        self.progress.apply_due_resets(now)
    }

    fn check_files_limit(&mut self, field_id: FieldId, batch: &[SelectedFile]) -> HookDecision {
        let Some(session) = self.sessions.get_mut(&field_id) else {
            return HookDecision::Abort(UploadError::UnknownField(field_id));
        };
        if session.control.disabled {
            return HookDecision::Abort(UploadError::ControlDisabled);
        }

        let previous = session.state;
        session.state = UploadState::LimitCheck;
        let (limit, current) = {
            let model = session.model.lock();
            (
                FileLimit::from_count(model.upload_multi_count),
                model.files.as_ref().map_or(0, FileCollection::len),
            )
        };
        let verdict = limit.check(current, batch.len());
        session.state = previous;

        crate::debug_log!(
            "UPLOAD",
            "limit check field {}: {:?} current={} batch={} -> {}",
            field_id,
            limit,
            current,
            batch.len(),
            if verdict.is_ok() { "ok" } else { "rejected" }
        );

        match verdict {
            Ok(()) => HookDecision::Proceed,
            Err(error) => {
                let message = error.user_message(&self.settings.strings);
                log::info!("Selection for field {field_id} rejected: {message}");
                self.publish(Topic::Alerts, BusMessage::Alert { message });
                HookDecision::Abort(error)
            }
        }
    }

    fn start(&mut self, field_id: FieldId) -> HookDecision {
        let batch = BatchId(self.next_batch);
        let Some(session) = self.sessions.get_mut(&field_id) else {
            return HookDecision::Abort(UploadError::UnknownField(field_id));
        };
        if session.control.disabled {
            return HookDecision::Abort(UploadError::ControlDisabled);
        }
        if session.state.is_uploading() {
            log::warn!("Field {field_id} started a transfer while one is in flight");
        }
        self.next_batch += 1;

        let (single, form_id) = {
            let model = session.model.lock();
            (model.is_single_file(), model.form_id)
        };
        if single {
            session.list_view.empty();
            session.files.reset();
        }
        session.state = UploadState::Uploading(batch);
        crate::debug_info!("UPLOAD", "field {} batch {:?} started", field_id, batch);

        self.publish(
            Topic::Fields,
            BusMessage::RemoveError {
                field_id,
                tag: UPLOAD_ERROR_TAG.to_string(),
            },
        );
        self.publish(
            Topic::Form(form_id),
            BusMessage::DisableSubmit {
                reason: self.settings.strings.upload_in_progress.clone(),
            },
        );
        HookDecision::Proceed
    }

    fn update_progress(&mut self, context: &DomContext, loaded: u64, total: u64) {
        let percent = percent_of(loaded, total);
        match context.field_id() {
            Some(field_id) if self.progress.set(field_id, percent) => {
                crate::debug_trace!("UPLOAD", "field {} progress {}%", field_id, percent);
            }
            Some(field_id) => log::warn!("No progress bar registered for field {field_id}"),
            None => log::warn!("Progress event outside any field wrapper ignored"),
        }
    }

    fn process_always(&mut self, field_id: FieldId, files: &[SelectedFile], index: usize) {
        if let Some(message) = files.get(index).and_then(|f| f.error.clone()) {
            self.show_error(field_id, &UploadError::PerFileError(message));
        }
    }

    fn done(&mut self, field_id: FieldId, context: &DomContext, raw: Option<&Value>, now: Instant) {
        let batch = match self.sessions.get_mut(&field_id) {
            Some(session) => {
                let batch = match session.state {
                    UploadState::Uploading(batch) => Some(batch),
                    _ => None,
                };
                session.state = UploadState::Idle;
                batch
            }
            None => {
                log::warn!("Transfer finished for unknown field {field_id}");
                return;
            }
        };

        let mut outcome = BatchOutcome {
            batch,
            added: Vec::new(),
            errors: Vec::new(),
        };

        let response = match TransferResult::from_value(raw) {
            TransferResult::Missing => {
                self.fail_batch(field_id, context, now, UploadError::UnknownUploadError, outcome);
                return;
            }
            TransferResult::Rejected => {
                self.fail_batch(field_id, context, now, UploadError::UploadError, outcome);
                return;
            }
            TransferResult::Completed(response) => response,
        };

        for message in &response.errors {
            let error = UploadError::PerFileError(message.clone());
            self.show_error(field_id, &error);
            outcome.errors.push(error);
        }

        let stored = response.stored_files();
        if stored.is_empty() {
            self.reset_progress(context, now);
            self.record_outcome(field_id, outcome);
            return;
        }

        let Some(session) = self.sessions.get_mut(&field_id) else {
            return;
        };
        for file in stored {
            outcome.added.push(session.files.add(&file.name, &file.tmp_name));
        }

        let (form_id, signal) = {
            let mut model = session.model.lock();
            model.files = Some(session.files.clone());
            model.trigger_files_changed();
            model.value = Value::from(1);
            (model.form_id, model.files_signal())
        };
        session.list_view.on_files_changed(signal);

        crate::debug_info!(
            "UPLOAD",
            "field {} batch {:?} stored {} file(s), {} error(s)",
            field_id,
            outcome.batch,
            outcome.added.len(),
            outcome.errors.len()
        );

        self.reset_progress(context, now);
        self.record_outcome(field_id, outcome);
        self.publish(
            Topic::Fields,
            BusMessage::ChangeField {
                field_id,
                context: Some(*context),
            },
        );
        self.publish(Topic::Form(form_id), BusMessage::EnableSubmit);
    }

    fn fail_batch(
        &mut self,
        field_id: FieldId,
        context: &DomContext,
        now: Instant,
        error: UploadError,
        mut outcome: BatchOutcome,
    ) {
        log::warn!("Upload for field {field_id} failed: {error}");
        self.show_error(field_id, &error);
        self.reset_progress(context, now);
        outcome.errors.push(error);
        self.record_outcome(field_id, outcome);
    }

    fn record_outcome(&mut self, field_id: FieldId, outcome: BatchOutcome) {
        if let Some(session) = self.sessions.get_mut(&field_id) {
            session.last_outcome = Some(outcome);
        }
    }

    fn reset_progress(&mut self, context: &DomContext, now: Instant) {
        let delay = self.settings.progress_reset_delay;
        match context.field_id() {
            Some(field_id) if self.progress.schedule_reset(field_id, now, delay) => {}
            Some(field_id) => log::warn!("No progress bar to reset for field {field_id}"),
            None => log::warn!("Progress reset outside any field wrapper ignored"),
        }
    }

    fn show_error(&self, field_id: FieldId, error: &UploadError) {
        self.publish(
            Topic::Fields,
            BusMessage::AddError {
                field_id,
                tag: UPLOAD_ERROR_TAG.to_string(),
                message: error.user_message(&self.settings.strings),
            },
        );
    }

    fn publish(&self, topic: Topic, message: BusMessage) {
        if let Err(e) = self.bus.publish(&Self::WIRING, topic, message) {
            log::error!("Bus wiring error: {e}");
        }
    }
}
