//! Typed in-process event bus.
//!
//! Components declare the topics they subscribe to and publish on as a
//! static [`Wiring`]; [`EventBus::publish`] refuses anything outside that
//! declaration, so wiring mistakes show up in tests instead of as silently
//! dropped events.
//!
//! Outbound traffic ([`BusMessage`]) fans out to every [`Subscription`] whose
//! filter matches and is also recorded in a journal. Inbound file-upload
//! channel traffic is typed separately in [`file_upload`].

pub mod file_upload;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Serialize, Serializer};

use crate::field::{FieldId, FormId};
use crate::upload::DomContext;

/// Error-display category used for every upload-related error.
pub const UPLOAD_ERROR_TAG: &str = "upload-file-error";

/// A concrete channel on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `file_upload`: inbound events for this controller
    FileUpload,
    /// `fields`: field-change notifications and error-display requests
    Fields,
    /// `form-<id>`: submit gating for one form
    Form(FormId),
    /// `alerts`: blocking user alerts
    Alerts,
}

/// A topic without its form id, used in static wiring declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    FileUpload,
    Fields,
    Form,
    Alerts,
}

impl Topic {
    pub fn kind(&self) -> TopicKind {
        match self {
            Topic::FileUpload => TopicKind::FileUpload,
            Topic::Fields => TopicKind::Fields,
            Topic::Form(_) => TopicKind::Form,
            Topic::Alerts => TopicKind::Alerts,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::FileUpload => write!(f, "file_upload"),
            Topic::Fields => write!(f, "fields"),
            Topic::Form(id) => write!(f, "form-{id}"),
            Topic::Alerts => write!(f, "alerts"),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outbound messages published by the upload controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum BusMessage {
    /// A field's value changed; dependent views and validators recompute.
    #[serde(rename = "change:field")]
    ChangeField {
        field_id: FieldId,
        /// The view the change came from, `None` for out-of-view changes
        context: Option<DomContext>,
    },

    #[serde(rename = "add:error")]
    AddError {
        field_id: FieldId,
        tag: String,
        message: String,
    },

    #[serde(rename = "remove:error")]
    RemoveError { field_id: FieldId, tag: String },

    #[serde(rename = "disable:submit")]
    DisableSubmit { reason: String },

    #[serde(rename = "enable:submit")]
    EnableSubmit,

    /// Blocking alert shown to the user
    #[serde(rename = "alert")]
    Alert { message: String },
}

impl BusMessage {
    /// The only kind of topic that may carry this message.
    pub fn topic_kind(&self) -> TopicKind {
        match self {
            BusMessage::ChangeField { .. }
            | BusMessage::AddError { .. }
            | BusMessage::RemoveError { .. } => TopicKind::Fields,
            BusMessage::DisableSubmit { .. } | BusMessage::EnableSubmit => TopicKind::Form,
            BusMessage::Alert { .. } => TopicKind::Alerts,
        }
    }

    /// Wire name, e.g. `"add:error"`.
    pub fn name(&self) -> &'static str {
        match self {
            BusMessage::ChangeField { .. } => "change:field",
            BusMessage::AddError { .. } => "add:error",
            BusMessage::RemoveError { .. } => "remove:error",
            BusMessage::DisableSubmit { .. } => "disable:submit",
            BusMessage::EnableSubmit => "enable:submit",
            BusMessage::Alert { .. } => "alert",
        }
    }
}

/// A published message together with the topic it went out on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub topic: Topic,
    pub message: BusMessage,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BusError {
    #[error("component `{component}` did not declare publishing on `{topic}`")]
    Undeclared {
        component: &'static str,
        topic: Topic,
    },
    #[error("`{message}` cannot be published on `{topic}`")]
    WrongTopic { message: &'static str, topic: Topic },
    #[error("component `{component}` lists {kind:?} twice in its wiring")]
    DuplicateTopic {
        component: &'static str,
        kind: TopicKind,
    },
    #[error("component `{component}` declares publishing on {kind:?}, which carries no outbound messages")]
    InboundOnly {
        component: &'static str,
        kind: TopicKind,
    },
}

/// Static declaration of a component's bus usage.
#[derive(Debug, Clone, Copy)]
pub struct Wiring {
    pub component: &'static str,
    pub subscribes: &'static [TopicKind],
    pub publishes: &'static [TopicKind],
}

impl Wiring {
    pub fn subscribes_to(&self, kind: TopicKind) -> bool {
        self.subscribes.contains(&kind)
    }

    pub fn publishes_on(&self, kind: TopicKind) -> bool {
        self.publishes.contains(&kind)
    }

    /// Check the declaration for duplicates and for publish targets that no
    /// outbound message can use.
    pub fn verify(&self) -> Result<(), BusError> {
        for list in [self.subscribes, self.publishes] {
            let mut seen = HashSet::new();
            for kind in list {
                if !seen.insert(*kind) {
                    return Err(BusError::DuplicateTopic {
                        component: self.component,
                        kind: *kind,
                    });
                }
            }
        }
        if let Some(kind) = self
            .publishes
            .iter()
            .find(|kind| **kind == TopicKind::FileUpload)
        {
            return Err(BusError::InboundOnly {
                component: self.component,
                kind: *kind,
            });
        }
        Ok(())
    }
}

/// Which envelopes a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicFilter {
    /// Everything
    All,
    /// Exactly these topics
    Topics(HashSet<Topic>),
    /// Any topic of these kinds (e.g. every `form-*` channel)
    Kinds(HashSet<TopicKind>),
}

impl TopicFilter {
    pub fn topic(topic: Topic) -> Self {
        TopicFilter::Topics(HashSet::from([topic]))
    }

    pub fn kind(kind: TopicKind) -> Self {
        TopicFilter::Kinds(HashSet::from([kind]))
    }

    fn matches(&self, topic: &Topic) -> bool {
        match self {
            TopicFilter::All => true,
            TopicFilter::Topics(topics) => topics.contains(topic),
            TopicFilter::Kinds(kinds) => kinds.contains(&topic.kind()),
        }
    }
}

/// Buffered receiver for matching envelopes.
#[derive(Debug)]
pub struct Subscription {
    filter: TopicFilter,
    pending: Mutex<Vec<Envelope>>,
}

impl Subscription {
    /// Take all envelopes received since the last drain, in publish order.
    pub fn drain(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Take only the messages, dropping topics.
    pub fn drain_messages(&self) -> Vec<BusMessage> {
        self.drain().into_iter().map(|e| e.message).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

/// The bus itself. Single instance per page, shared by `Arc`.
#[derive(Debug, Default)]
pub struct EventBus {
    subscriptions: Mutex<Vec<Arc<Subscription>>>,
    journal: Mutex<Vec<Envelope>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscription.
    pub fn subscribe(&self, filter: TopicFilter) -> Arc<Subscription> {
        let subscription = Arc::new(Subscription {
            filter,
            pending: Mutex::new(Vec::new()),
        });
        self.subscriptions.lock().push(Arc::clone(&subscription));
        subscription
    }

    /// Publish `message` on `topic` on behalf of the component described by `wiring`.
    pub fn publish(
        &self,
        wiring: &Wiring,
        topic: Topic,
        message: BusMessage,
    ) -> Result<(), BusError> {
        if !wiring.publishes_on(topic.kind()) {
            return Err(BusError::Undeclared {
                component: wiring.component,
                topic,
            });
        }
        if message.topic_kind() != topic.kind() {
            return Err(BusError::WrongTopic {
                message: message.name(),
                topic,
            });
        }

        crate::debug_info!("BUS", "{} -> {}: {:?}", wiring.component, topic, message);

        let envelope = Envelope { topic, message };
        for subscription in self.subscriptions.lock().iter() {
            if subscription.filter.matches(&topic) {
                subscription.pending.lock().push(envelope.clone());
            }
        }
        self.journal.lock().push(envelope);
        Ok(())
    }

    /// Every envelope published so far.
    pub fn journal(&self) -> Vec<Envelope> {
        self.journal.lock().clone()
    }

    /// Take the journal, leaving it empty.
    pub fn take_journal(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.journal.lock())
    }
}
