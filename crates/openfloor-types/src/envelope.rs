//! The envelope exchanged between agents, and everything it wraps.
//!
//! An [`Envelope`] carries one [`Schema`], one [`Conversation`], one
//! [`Sender`] and zero or more [`Event`]s. No cross-event checks happen
//! here; whether a `to` names an actual conversant is the receiving
//! agent's business.

use crate::error::{OpenFloorResult, ValidationError};
use crate::manifest::Identification;
use crate::open_map::{Parameters, PersistentState};
use crate::record::{record_serde, Fields, Projection, Record};
use serde_json::Value;
use uuid::Uuid;

/// Schema version written when none is given.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// Prefix of auto-generated conversation ids.
pub const CONVERSATION_ID_PREFIX: &str = "conv:";

/// Envelope format version marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Format version.
    pub version: String,
    /// Where the schema is published.
    pub url: Option<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            version: DEFAULT_SCHEMA_VERSION.to_string(),
            url: None,
        }
    }
}

impl Schema {
    /// A schema marker; `None` means the default version.
    pub fn new(version: Option<String>, url: Option<String>) -> Self {
        Self {
            version: version.unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string()),
            url,
        }
    }
}

impl Record for Schema {
    const NAME: &'static str = "Schema";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.field("version", &self.version)?;
        p.optional("url", self.url.as_ref())?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let version = f.optional("version")?;
        let url = f.optional("url")?;
        f.finish()?;
        Ok(Self::new(version, url))
    }
}

/// One participant and its private state.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversant {
    /// Who the participant is.
    pub identification: Identification,
    /// State the participant asked to have carried along.
    pub persistent_state: PersistentState,
}

impl Conversant {
    /// A conversant with empty persistent state.
    pub fn new(identification: Identification) -> Self {
        Self {
            identification,
            persistent_state: PersistentState::new(),
        }
    }

    /// Replace the persistent state.
    pub fn with_persistent_state(mut self, state: PersistentState) -> Self {
        self.persistent_state = state;
        self
    }
}

impl Record for Conversant {
    const NAME: &'static str = "Conversant";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.record("identification", &self.identification)?;
        if !self.persistent_state.is_empty() {
            p.record("persistentState", &self.persistent_state)?;
        }
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let identification = f.required_record("identification")?;
        let persistent_state = f.optional_record("persistentState")?.unwrap_or_default();
        f.finish()?;
        Ok(Self {
            identification,
            persistent_state,
        })
    }
}

/// The conversation thread an envelope belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    /// Conversation id.
    pub id: String,
    /// Known participants, in order.
    pub conversants: Vec<Conversant>,
}

impl Conversation {
    /// A conversation; `None` generates a fresh `conv:<uuid>` id.
    pub fn new(id: Option<String>, conversants: Vec<Conversant>) -> Self {
        Self {
            id: id.unwrap_or_else(Self::generate_id),
            conversants,
        }
    }

    /// A fresh conversation id.
    pub fn generate_id() -> String {
        format!("{CONVERSATION_ID_PREFIX}{}", Uuid::new_v4())
    }

    /// Add a participant.
    pub fn with_conversant(mut self, conversant: Conversant) -> Self {
        self.conversants.push(conversant);
        self
    }

    /// Find a participant by speaker URI.
    pub fn conversant(&self, speaker_uri: &str) -> Option<&Conversant> {
        self.conversants
            .iter()
            .find(|c| c.identification.speaker_uri == speaker_uri)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(None, Vec::new())
    }
}

impl Record for Conversation {
    const NAME: &'static str = "Conversation";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.field("id", &self.id)?;
        p.non_empty_records("conversants", &self.conversants)?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let id = f.optional("id")?;
        let conversants = f.records("conversants")?;
        f.finish()?;
        Ok(Self::new(id, conversants))
    }
}

/// Who sent an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Sender {
    /// Sender's speaker URI.
    pub speaker_uri: String,
    /// Sender's service URL.
    pub service_url: Option<String>,
}

impl Sender {
    /// A sender with only a speaker URI.
    pub fn new(speaker_uri: impl Into<String>) -> Self {
        Self {
            speaker_uri: speaker_uri.into(),
            service_url: None,
        }
    }

    /// Set the service URL.
    pub fn with_service_url(mut self, service_url: impl Into<String>) -> Self {
        self.service_url = Some(service_url.into());
        self
    }
}

impl From<&Identification> for Sender {
    fn from(id: &Identification) -> Self {
        Self::new(id.speaker_uri.clone()).with_service_url(id.service_url.clone())
    }
}

impl Record for Sender {
    const NAME: &'static str = "Sender";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.field("speakerUri", &self.speaker_uri)?;
        p.optional("serviceUrl", self.service_url.as_ref())?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let sender = Self {
            speaker_uri: f.required("speakerUri")?,
            service_url: f.optional("serviceUrl")?,
        };
        f.finish()?;
        Ok(sender)
    }
}

/// Addressing for an event. At least one address must be set.
#[derive(Debug, Clone, PartialEq)]
pub struct To {
    /// Target speaker URI.
    pub speaker_uri: Option<String>,
    /// Target service URL.
    pub service_url: Option<String>,
    /// Whether only the target should see the event.
    pub private: bool,
}

impl To {
    /// Address by speaker URI and/or service URL.
    pub fn new(
        speaker_uri: Option<String>,
        service_url: Option<String>,
        private: bool,
    ) -> OpenFloorResult<Self> {
        let to = Self {
            speaker_uri,
            service_url,
            private,
        };
        to.validate()?;
        Ok(to)
    }

    /// Address a speaker.
    pub fn speaker(speaker_uri: impl Into<String>) -> Self {
        Self {
            speaker_uri: Some(speaker_uri.into()),
            service_url: None,
            private: false,
        }
    }

    /// Address a service endpoint.
    pub fn service(service_url: impl Into<String>) -> Self {
        Self {
            speaker_uri: None,
            service_url: Some(service_url.into()),
            private: false,
        }
    }

    /// Mark as private.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Check that at least one address is present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.speaker_uri.is_none() && self.service_url.is_none() {
            return Err(ValidationError::NoAddress);
        }
        Ok(())
    }

    /// Whether this addresses the given agent.
    pub fn matches(&self, id: &Identification) -> bool {
        self.speaker_uri.as_deref() == Some(id.speaker_uri.as_str())
            || self.service_url.as_deref() == Some(id.service_url.as_str())
    }
}

impl Record for To {
    const NAME: &'static str = "To";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.optional("speakerUri", self.speaker_uri.as_ref())?;
        p.optional("serviceUrl", self.service_url.as_ref())?;
        if self.private {
            p.field("private", &true)?;
        }
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let speaker_uri = f.optional("speakerUri")?;
        let service_url = f.optional("serviceUrl")?;
        let private = f.optional("private")?.unwrap_or(false);
        f.finish()?;
        Self::new(speaker_uri, service_url, private)
    }
}

/// One directive or notification inside an envelope.
///
/// `event_type` is a free-form discriminator; see [`crate::events`] for the
/// well-known kinds and helpers that build their parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Discriminator, e.g. `"utterance"`.
    pub event_type: String,
    /// Who the event is for. `None` means everyone.
    pub to: Option<To>,
    /// Why the event was sent.
    pub reason: Option<String>,
    /// Event-type-specific payload.
    pub parameters: Parameters,
}

impl Event {
    /// An event with no addressing, reason or parameters.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            to: None,
            reason: None,
            parameters: Parameters::new(),
        }
    }

    /// Address the event.
    pub fn with_to(mut self, to: To) -> Self {
        self.to = Some(to);
        self
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Replace the parameters.
    pub fn with_parameters(mut self, parameters: impl Into<Parameters>) -> Self {
        self.parameters = parameters.into();
        self
    }

    /// True if the event has no `to`, or its `to` names this agent.
    pub fn is_addressed_to(&self, id: &Identification) -> bool {
        self.to.as_ref().map_or(true, |to| to.matches(id))
    }
}

impl Record for Event {
    const NAME: &'static str = "Event";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.field("eventType", &self.event_type)?;
        p.optional_record("to", self.to.as_ref())?;
        p.optional("reason", self.reason.as_ref())?;
        if !self.parameters.is_empty() {
            p.record("parameters", &self.parameters)?;
        }
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let event = Self {
            event_type: f.required("eventType")?,
            to: f.optional_record("to")?,
            reason: f.optional("reason")?,
            parameters: f.optional_record("parameters")?.unwrap_or_default(),
        };
        f.finish()?;
        Ok(event)
    }
}

/// The wire-level message.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Format version marker.
    pub schema: Schema,
    /// The conversation this belongs to.
    pub conversation: Conversation,
    /// Who sent it.
    pub sender: Sender,
    /// Events, in order.
    pub events: Vec<Event>,
}

impl Envelope {
    /// An envelope with the default schema and no events.
    pub fn new(conversation: Conversation, sender: Sender) -> Self {
        Self {
            schema: Schema::default(),
            conversation,
            sender,
            events: Vec::new(),
        }
    }

    /// Replace the schema marker.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Append an event.
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Events addressed to the given agent (or to everyone).
    pub fn events_for<'a>(&'a self, id: &'a Identification) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.is_addressed_to(id))
    }
}

impl Record for Envelope {
    const NAME: &'static str = "Envelope";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.record("schema", &self.schema)?;
        p.record("conversation", &self.conversation)?;
        p.record("sender", &self.sender)?;
        p.non_empty_records("events", &self.events)?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let envelope = Self {
            schema: f.optional_record("schema")?.unwrap_or_default(),
            conversation: f.required_record("conversation")?,
            sender: f.required_record("sender")?,
            events: f.records("events")?,
        };
        f.finish()?;
        Ok(envelope)
    }
}

record_serde!(Schema, Conversant, Conversation, Sender, To, Event, Envelope);
