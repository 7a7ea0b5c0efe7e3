//! Well-known event kinds.
//!
//! [`Event`] stays generic on the wire: an `eventType` string plus open
//! [`Parameters`]. This module names the kinds the protocol defines and
//! builds (and reads back) the parameter shapes that some of them carry.

use crate::dialog::{DialogEvent, DialogHistory};
use crate::envelope::{Event, To};
use crate::error::OpenFloorResult;
use crate::manifest::Manifest;
use crate::open_map::Parameters;
use crate::record::{project_list, reconstruct_list};
use std::fmt;

/// Parameter key of an utterance's dialog event.
pub const DIALOG_EVENT_KEY: &str = "dialogEvent";
/// Parameter key of a context event's dialog history.
pub const DIALOG_HISTORY_KEY: &str = "dialogHistory";
/// Parameter key of manifests for agents able to service a request.
pub const SERVICING_MANIFESTS_KEY: &str = "servicingManifests";
/// Parameter key of manifests offered for discovery only.
pub const DISCOVERY_MANIFESTS_KEY: &str = "discoveryManifests";

/// The `eventType` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Utterance,
    Context,
    Invite,
    Uninvite,
    DeclineInvite,
    Bye,
    GetManifests,
    PublishManifests,
    RequestFloor,
    GrantFloor,
    RevokeFloor,
    YieldFloor,
    /// Any type this crate does not know about, kept verbatim.
    Other(String),
}

impl EventType {
    /// Wire spelling.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Utterance => "utterance",
            Self::Context => "context",
            Self::Invite => "invite",
            Self::Uninvite => "uninvite",
            Self::DeclineInvite => "declineInvite",
            Self::Bye => "bye",
            Self::GetManifests => "getManifests",
            Self::PublishManifests => "publishManifests",
            Self::RequestFloor => "requestFloor",
            Self::GrantFloor => "grantFloor",
            Self::RevokeFloor => "revokeFloor",
            Self::YieldFloor => "yieldFloor",
            Self::Other(s) => s,
        }
    }

    /// Parse a wire spelling. Never fails; unknown names become `Other`.
    pub fn parse(s: &str) -> Self {
        match s {
            "utterance" => Self::Utterance,
            "context" => Self::Context,
            "invite" => Self::Invite,
            "uninvite" => Self::Uninvite,
            "declineInvite" => Self::DeclineInvite,
            "bye" => Self::Bye,
            "getManifests" => Self::GetManifests,
            "publishManifests" => Self::PublishManifests,
            "requestFloor" => Self::RequestFloor,
            "grantFloor" => Self::GrantFloor,
            "revokeFloor" => Self::RevokeFloor,
            "yieldFloor" => Self::YieldFloor,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        match t {
            EventType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl Event {
    /// An event of a well-known kind.
    pub fn of(kind: EventType) -> Self {
        Self::new(kind)
    }

    /// The parsed discriminator.
    pub fn kind(&self) -> EventType {
        EventType::parse(&self.event_type)
    }

    /// An utterance carrying one dialog event.
    pub fn utterance(dialog_event: &DialogEvent) -> OpenFloorResult<Self> {
        let mut parameters = Parameters::new();
        parameters.insert_record(DIALOG_EVENT_KEY, dialog_event)?;
        Ok(Self::of(EventType::Utterance).with_parameters(parameters))
    }

    /// A context event, optionally carrying the dialog so far.
    pub fn context(history: Option<&DialogHistory>) -> OpenFloorResult<Self> {
        let mut parameters = Parameters::new();
        if let Some(history) = history {
            parameters.insert_record(DIALOG_HISTORY_KEY, history)?;
        }
        Ok(Self::of(EventType::Context).with_parameters(parameters))
    }

    /// Invite an agent into the conversation.
    pub fn invite(to: To) -> Self {
        Self::of(EventType::Invite).with_to(to)
    }

    /// Ask an agent to leave the conversation.
    pub fn uninvite(to: To) -> Self {
        Self::of(EventType::Uninvite).with_to(to)
    }

    /// Refuse an invitation.
    pub fn decline_invite(to: To) -> Self {
        Self::of(EventType::DeclineInvite).with_to(to)
    }

    /// Leave the conversation.
    pub fn bye() -> Self {
        Self::of(EventType::Bye)
    }

    /// Ask an agent for its manifests.
    pub fn get_manifests(to: To) -> Self {
        Self::of(EventType::GetManifests).with_to(to)
    }

    /// Publish manifests. Empty lists are left out of the parameters.
    pub fn publish_manifests(
        servicing: &[Manifest],
        discovery: &[Manifest],
    ) -> OpenFloorResult<Self> {
        let mut parameters = Parameters::new();
        if !servicing.is_empty() {
            parameters.insert(SERVICING_MANIFESTS_KEY, project_list(servicing)?);
        }
        if !discovery.is_empty() {
            parameters.insert(DISCOVERY_MANIFESTS_KEY, project_list(discovery)?);
        }
        Ok(Self::of(EventType::PublishManifests).with_parameters(parameters))
    }

    /// Ask the convener for the floor.
    pub fn request_floor() -> Self {
        Self::of(EventType::RequestFloor)
    }

    /// Give the floor to an agent.
    pub fn grant_floor(to: To) -> Self {
        Self::of(EventType::GrantFloor).with_to(to)
    }

    /// Take the floor back from an agent.
    pub fn revoke_floor(to: To) -> Self {
        Self::of(EventType::RevokeFloor).with_to(to)
    }

    /// Give up the floor.
    pub fn yield_floor() -> Self {
        Self::of(EventType::YieldFloor)
    }

    /// The embedded dialog event, if the parameters carry one.
    pub fn dialog_event(&self) -> Option<OpenFloorResult<DialogEvent>> {
        self.parameters.get_record(DIALOG_EVENT_KEY)
    }

    /// The embedded dialog history, if the parameters carry one.
    pub fn dialog_history(&self) -> Option<OpenFloorResult<DialogHistory>> {
        self.parameters.get_record(DIALOG_HISTORY_KEY)
    }

    /// Servicing manifests; absent means none.
    pub fn servicing_manifests(&self) -> OpenFloorResult<Vec<Manifest>> {
        self.manifests(SERVICING_MANIFESTS_KEY)
    }

    /// Discovery manifests; absent means none.
    pub fn discovery_manifests(&self) -> OpenFloorResult<Vec<Manifest>> {
        self.manifests(DISCOVERY_MANIFESTS_KEY)
    }

    fn manifests(&self, key: &str) -> OpenFloorResult<Vec<Manifest>> {
        match self.parameters.get(key) {
            Some(value) if !value.is_null() => reconstruct_list("Parameters", key, value.clone()),
            _ => Ok(Vec::new()),
        }
    }
}

impl From<EventType> for Event {
    fn from(kind: EventType) -> Self {
        Self::of(kind)
    }
}
