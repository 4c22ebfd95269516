//! YAML scenario replay.
//!
//! A scenario declares a set of field models and a list of user/transport
//! steps. [`Replay`] wires a bus, a field registry, an [`UploadController`]
//! and a [`ScriptedTransport`] together, runs the steps against a virtual
//! clock, and records everything observable as [`ReplayLine`]s.
//!
//! ```yaml
//! fields:
//!   - model: { id: 7, formID: 3, upload_multi_count: 2, max_file_size: 1048576, max_file_size_mb: "1" }
//! steps:
//!   - upload:
//!       field: 7
//!       files: [{ name: a.png, size: 1000 }]
//!       response: { errors: [], data: { files: [{ name: a.png, tmp_name: tmp1 }] } }
//!   - tick: { after_ms: 1500 }
//!   - delete: { field: 7, index: 0 }
//!   - validate: { field: 7 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use field_upload_config::Config;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bus::file_upload::{FileUploadEvent, FileUploadReply, FileUploadRequest, UiEvent};
use crate::bus::{Envelope, EventBus, Subscription, TopicFilter};
use crate::field::{FieldDirectory, FieldHandle, FieldId, FieldModel, FieldRegistry};
use crate::upload::{
    DomContext, FieldView, ProgressRegistry, ScriptedTransport, SelectedFile, SelectionSource,
    UploadController, UploadSettings,
};

/// One field to create before the steps run.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioField {
    /// Raw field configuration, as the host page would provide it
    pub model: Value,
    /// Value of the view's hidden nonce input
    #[serde(default)]
    pub nonce: Option<String>,
    /// `false` simulates an environment without native file inputs
    #[serde(default = "default_true")]
    pub file_input: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Select files and run the transfer to completion
    Upload {
        field: FieldId,
        #[serde(default)]
        source: SelectionSource,
        files: Vec<SelectedFile>,
        /// Parsed server result; omit for a transfer without result
        #[serde(default)]
        response: Option<Value>,
    },
    /// Click delete on row `index` of the field's file list
    Delete { field: FieldId, index: usize },
    /// Ask whether the required-field check is satisfied
    Validate { field: FieldId },
    /// Ask for the field's submit data
    Submit { field: FieldId },
    /// Advance the virtual clock
    Tick { after_ms: u64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub fields: Vec<ScenarioField>,
    #[serde(default, with = "serde_yaml_ng::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml_ng::from_str(contents).context("Failed to parse scenario")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_yaml(&contents)
    }
}

/// Something observable that happened during a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayLine {
    /// An envelope published on the bus
    Bus { step: usize, envelope: Envelope },
    /// Summary of one upload step
    Transfer {
        step: usize,
        field_id: FieldId,
        accepted: bool,
        started: bool,
        progress: Vec<u8>,
    },
    Required {
        step: usize,
        field_id: FieldId,
        satisfied: bool,
    },
    SubmitData {
        step: usize,
        field_id: FieldId,
        data: Map<String, Value>,
    },
    /// Progress bars cleared by a tick
    Reset { step: usize, fields: Vec<FieldId> },
    /// Submit data of every field, after the last step
    Payload { fields: BTreeMap<String, Map<String, Value>> },
}

/// A self-contained page: bus, registry, controller and transport.
pub struct Replay {
    bus: Arc<EventBus>,
    registry: Arc<FieldRegistry>,
    controller: UploadController,
    transport: ScriptedTransport,
    tap: Arc<Subscription>,
    epoch: Instant,
    elapsed: Duration,
}

impl Replay {
    pub fn new(config: &Config) -> Self {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(FieldRegistry::new());
        let tap = bus.subscribe(TopicFilter::All);
        let fields: Arc<dyn FieldDirectory> = registry.clone();
        let controller = UploadController::new(
            UploadSettings::from(config),
            Arc::clone(&bus),
            fields,
            ProgressRegistry::new(),
        );
        Self {
            bus,
            registry,
            controller,
            transport: ScriptedTransport::new(),
            tap,
            epoch: Instant::now(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn controller(&self) -> &UploadController {
        &self.controller
    }

    pub fn transport(&self) -> &ScriptedTransport {
        &self.transport
    }

    fn now(&self) -> Instant {
        self.epoch + self.elapsed
    }

    fn field(&self, id: FieldId) -> Result<FieldHandle> {
        self.registry
            .get_field(id)
            .with_context(|| format!("Scenario refers to unknown field {id}"))
    }

    /// Create, initialize and render one field.
    pub fn add_field(&mut self, field: &ScenarioField) -> Result<FieldId> {
        let model = FieldModel::from_json(field.model.clone())
            .context("Invalid field model in scenario")?;
        let id = model.id;
        let handle = self.registry.insert(model);

        self.controller
            .handle(FileUploadEvent::InitModel(Arc::clone(&handle)), &mut self.transport);

        let mut view = FieldView::new(handle);
        if let Some(nonce) = &field.nonce {
            view = view.with_nonce(nonce.clone());
        }
        if !field.file_input {
            view = view.without_file_input();
        }
        self.controller
            .handle(FileUploadEvent::RenderView(view), &mut self.transport);
        Ok(id)
    }

    /// Run every field and step of `scenario`.
    pub fn run(&mut self, scenario: &Scenario) -> Result<Vec<ReplayLine>> {
        let mut lines = Vec::new();
        for field in &scenario.fields {
            self.add_field(field)?;
        }
        self.drain_bus(0, &mut lines);

        for (index, step) in scenario.steps.iter().enumerate() {
            let number = index + 1;
            self.run_step(number, step, &mut lines)
                .with_context(|| format!("Step {number} failed"))?;
            self.drain_bus(number, &mut lines);
        }

        lines.push(ReplayLine::Payload {
            fields: self.payload()?,
        });
        Ok(lines)
    }

    fn run_step(&mut self, step: usize, action: &Step, lines: &mut Vec<ReplayLine>) -> Result<()> {
        crate::debug_info!("REPLAY", "step {}: {:?}", step, action);
        match action {
            Step::Upload {
                field,
                source,
                files,
                response,
            } => {
                self.field(*field)?;
                let now = self.now();
                let report = self.transport.upload(
                    &mut self.controller,
                    *field,
                    *source,
                    files.clone(),
                    response.clone(),
                    now,
                );
                lines.push(ReplayLine::Transfer {
                    step,
                    field_id: *field,
                    accepted: report.gate.is_proceed(),
                    started: report.started,
                    progress: report.progress,
                });
            }
            Step::Delete { field, index } => {
                let record = self
                    .controller
                    .session(*field)
                    .and_then(|session| session.list_view().click_delete(*index));
                let Some(record) = record else {
                    bail!("Field {field} has no file at row {index}");
                };
                self.controller.handle(
                    FileUploadEvent::DeleteFile {
                        event: UiEvent::new(),
                        record,
                    },
                    &mut self.transport,
                );
            }
            Step::Validate { field } => {
                let handle = self.field(*field)?;
                let reply = self.controller.reply(FileUploadRequest::ValidateRequired {
                    context: Some(DomContext::in_field(*field)),
                    field: handle,
                });
                if let FileUploadReply::Required(satisfied) = reply {
                    lines.push(ReplayLine::Required {
                        step,
                        field_id: *field,
                        satisfied,
                    });
                }
            }
            Step::Submit { field } => {
                let data = self.submit_data(*field)?;
                lines.push(ReplayLine::SubmitData {
                    step,
                    field_id: *field,
                    data,
                });
            }
            Step::Tick { after_ms } => {
                self.elapsed += Duration::from_millis(*after_ms);
                let now = self.now();
                let fields = self.controller.tick(now);
                if !fields.is_empty() {
                    lines.push(ReplayLine::Reset { step, fields });
                }
            }
        }
        Ok(())
    }

    fn submit_data(&self, field: FieldId) -> Result<Map<String, Value>> {
        let handle = self.field(field)?;
        let mut field_data = Map::new();
        field_data.insert("id".to_string(), Value::from(field.0));
        match self.controller.reply(FileUploadRequest::GetSubmitData {
            field_data,
            field: handle,
        }) {
            FileUploadReply::SubmitData(data) => Ok(data),
            FileUploadReply::Required(_) => bail!("Unexpected reply to get:submitData"),
        }
    }

    fn payload(&self) -> Result<BTreeMap<String, Map<String, Value>>> {
        let mut fields = BTreeMap::new();
        for id in self.registry.ids() {
            fields.insert(id.to_string(), self.submit_data(id)?);
        }
        Ok(fields)
    }

    fn drain_bus(&self, step: usize, lines: &mut Vec<ReplayLine>) {
        lines.extend(
            self.tap
                .drain()
                .into_iter()
                .map(|envelope| ReplayLine::Bus { step, envelope }),
        );
    }
}
