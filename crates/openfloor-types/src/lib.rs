//! Core records of the Open Floor conversational envelope.
//!
//! This crate defines the data model exchanged between conversational agents
//! (envelopes, dialog events, manifests) together with its canonical JSON
//! mapping. It does no I/O; see `openfloor-wire` for encoding to text and
//! files.
//!
//! Every record implements [`Record`]: `project` turns it into an ordered
//! JSON value with optional fields omitted, and `reconstruct` rebuilds and
//! validates it from untyped JSON. Records also implement serde's traits by
//! delegating to those two operations.

pub mod dialog;
pub mod duration;
pub mod envelope;
pub mod error;
pub mod events;
pub mod feature_registry;
pub mod manifest;
pub mod open_map;
pub mod record;

pub use dialog::{DialogEvent, DialogHistory, Feature, FeatureMap, Span, Token};
pub use envelope::{Conversant, Conversation, Envelope, Event, Schema, Sender, To};
pub use error::{OpenFloorError, OpenFloorResult, ValidationError};
pub use events::EventType;
pub use feature_registry::{FeatureKind, FeatureRegistry};
pub use manifest::{Capability, Identification, Manifest, SupportedLayers};
pub use open_map::{Parameters, PersistentState};
pub use record::Record;
