//! Deterministic in-process transport.
//!
//! Plays the transport's side of the hook contract without any network:
//! gate, per-file processing, start, progress ticks and completion with a
//! caller-supplied server result. Used by the replay binary and the tests.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::controller::UploadController;
use super::transport::{
    DomContext, HookDecision, SelectedFile, TransferEvent, TransportOptions, UploadTransport,
};
use crate::field::FieldId;

/// Default number of progress callbacks per transfer.
const DEFAULT_PROGRESS_STEPS: u32 = 4;

/// How the user supplied the selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    /// Picked through the file input
    #[default]
    Picker,
    /// Dropped onto the control
    Drop,
}

/// What happened to one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub field_id: FieldId,
    /// The controller's answer to the change/drop gate
    pub gate: HookDecision,
    /// Files after the processing step, with errors filled in
    pub processed: Vec<SelectedFile>,
    /// Whether the request was sent
    pub started: bool,
    /// Bar width observed after each progress callback
    pub progress: Vec<u8>,
}

impl TransferReport {
    fn new(field_id: FieldId, gate: HookDecision) -> Self {
        Self {
            field_id,
            gate,
            processed: Vec::new(),
            started: false,
            progress: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct ScriptedTransport {
    attached: HashMap<FieldId, TransportOptions>,
    disabled: HashSet<FieldId>,
    progress_steps: u32,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            attached: HashMap::new(),
            disabled: HashSet::new(),
            progress_steps: DEFAULT_PROGRESS_STEPS,
        }
    }

    /// Number of progress callbacks per transfer (at least one).
    pub fn with_progress_steps(mut self, steps: u32) -> Self {
        self.progress_steps = steps.max(1);
        self
    }

    /// Options the field was attached with, if any.
    pub fn options(&self, field_id: FieldId) -> Option<&TransportOptions> {
        self.attached.get(&field_id)
    }

    pub fn is_disabled(&self, field_id: FieldId) -> bool {
        self.disabled.contains(&field_id)
    }

    /// Run one selection through the full hook sequence.
    ///
    /// `response` is the parsed server result delivered with `done`; `None`
    /// models a transfer that produced no result.
    pub fn upload(
        &mut self,
        controller: &mut UploadController,
        field_id: FieldId,
        source: SelectionSource,
        files: Vec<SelectedFile>,
        response: Option<Value>,
        now: Instant,
    ) -> TransferReport {
        let selection = match source {
            SelectionSource::Picker => TransferEvent::Change {
                files: files.clone(),
            },
            SelectionSource::Drop => TransferEvent::Drop {
                files: files.clone(),
            },
        };
        let gate = controller.on_transfer(field_id, selection, now);
        let mut report = TransferReport::new(field_id, gate);
        if !report.gate.is_proceed() {
            crate::debug_info!("TRANSPORT", "field {} selection aborted at gate", field_id);
            return report;
        }

        report.processed = self.process(field_id, files);
        for index in 0..report.processed.len() {
            controller.on_transfer(
                field_id,
                TransferEvent::ProcessAlways {
                    files: report.processed.clone(),
                    index,
                },
                now,
            );
        }

        let flagged = report.processed.iter().filter(|f| f.error.is_some()).count();
        if report.processed.is_empty() || flagged > 0 {
            crate::debug_info!(
                "TRANSPORT",
                "field {} not sent: {} file(s), {} flagged",
                field_id,
                report.processed.len(),
                flagged
            );
            return report;
        }

        if !controller.on_transfer(field_id, TransferEvent::Start, now).is_proceed() {
            return report;
        }
        report.started = true;

        let context = DomContext::in_field(field_id);
        let total = report
            .processed
            .iter()
            .fold(0u64, |acc, f| acc.saturating_add(f.size));
        for step in 1..=self.progress_steps {
            let loaded = (u128::from(total) * u128::from(step) / u128::from(self.progress_steps)) as u64;
            controller.on_transfer(
                field_id,
                TransferEvent::ProgressAll {
                    context,
                    loaded,
                    total,
                },
                now,
            );
            report.progress.push(controller.progress().percent(field_id));
        }

        controller.on_transfer(
            field_id,
            TransferEvent::Done {
                context,
                result: response,
            },
            now,
        );
        report
    }

    /// Client-side processing: flag files over the attached size cap.
    fn process(&self, field_id: FieldId, mut files: Vec<SelectedFile>) -> Vec<SelectedFile> {
        let Some(options) = self.attached.get(&field_id) else {
            return files;
        };
        if let Some(max) = options.max_file_size {
            for file in files.iter_mut().filter(|f| f.size > max) {
                log::debug!("{} exceeds {} bytes", file.name, max);
                file.error = Some(options.messages.max_file_size.clone());
            }
        }
        files
    }
}

impl UploadTransport for ScriptedTransport {
    fn attach(&mut self, field_id: FieldId, options: TransportOptions) {
        self.disabled.remove(&field_id);
        self.attached.insert(field_id, options);
    }

    fn disable(&mut self, field_id: FieldId) {
        self.disabled.insert(field_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FormId;
    use crate::upload::{TransportFormData, TransportMessages};

    fn options(max: Option<u64>) -> TransportOptions {
        TransportOptions {
            url: "/upload".into(),
            data_type: "json".into(),
            form_data: TransportFormData {
                form_id: FormId(1),
                field_id: FieldId(2),
                nonce: "n".into(),
            },
            messages: TransportMessages {
                max_file_size: "too big".into(),
            },
            single_file_uploads: false,
            max_file_size: max,
        }
    }

    #[test]
    fn test_process_flags_oversized_files() {
        let mut transport = ScriptedTransport::new();
        transport.attach(FieldId(2), options(Some(10)));
        let processed = transport.process(
            FieldId(2),
            vec![SelectedFile::new("small", 10), SelectedFile::new("large", 11)],
        );
        assert_eq!(processed[0].error, None);
        assert_eq!(processed[1].error.as_deref(), Some("too big"));
    }

    #[test]
    fn test_no_cap_leaves_files_alone() {
        let mut transport = ScriptedTransport::new();
        transport.attach(FieldId(2), options(None));
        let processed = transport.process(FieldId(2), vec![SelectedFile::new("huge", u64::MAX)]);
        assert!(processed[0].error.is_none());
    }

    #[test]
    fn test_attach_clears_disabled() {
        let mut transport = ScriptedTransport::new().with_progress_steps(0);
        assert_eq!(transport.progress_steps, 1);
        transport.disable(FieldId(2));
        assert!(transport.is_disabled(FieldId(2)));
        transport.attach(FieldId(2), options(None));
        assert!(!transport.is_disabled(FieldId(2)));
    }
}
