//! Agent identity and capability manifests.
//!
//! A [`Manifest`] is what an agent publishes about itself: who it is
//! ([`Identification`]) and what it can do ([`Capability`]).

use crate::error::OpenFloorResult;
use crate::record::{record_serde, Fields, Projection, Record};
use serde_json::Value;

/// Modality tag for text input and output.
pub const TEXT_LAYER: &str = "text";

/// Who an agent is.
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    /// Unique identifier of the speaker.
    pub speaker_uri: String,
    /// Endpoint the agent is served from.
    pub service_url: String,
    /// Owning organization.
    pub organization: Option<String>,
    /// Name used in conversation.
    pub conversational_name: Option<String>,
    /// Department within the organization.
    pub department: Option<String>,
    /// Role of the agent.
    pub role: Option<String>,
    /// Short description.
    pub synopsis: Option<String>,
}

impl Identification {
    /// An identification with only the required fields.
    pub fn new(speaker_uri: impl Into<String>, service_url: impl Into<String>) -> Self {
        Self {
            speaker_uri: speaker_uri.into(),
            service_url: service_url.into(),
            organization: None,
            conversational_name: None,
            department: None,
            role: None,
            synopsis: None,
        }
    }

    /// Set the organization.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Set the conversational name.
    pub fn with_conversational_name(mut self, name: impl Into<String>) -> Self {
        self.conversational_name = Some(name.into());
        self
    }

    /// Set the department.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Set the role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the synopsis.
    pub fn with_synopsis(mut self, synopsis: impl Into<String>) -> Self {
        self.synopsis = Some(synopsis.into());
        self
    }
}

impl Record for Identification {
    const NAME: &'static str = "Identification";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.field("speakerUri", &self.speaker_uri)?;
        p.field("serviceUrl", &self.service_url)?;
        p.optional("organization", self.organization.as_ref())?;
        p.optional("conversationalName", self.conversational_name.as_ref())?;
        p.optional("department", self.department.as_ref())?;
        p.optional("role", self.role.as_ref())?;
        p.optional("synopsis", self.synopsis.as_ref())?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let identification = Self {
            speaker_uri: f.required("speakerUri")?,
            service_url: f.required("serviceUrl")?,
            organization: f.optional("organization")?,
            conversational_name: f.optional("conversationalName")?,
            department: f.optional("department")?,
            role: f.optional("role")?,
            synopsis: f.optional("synopsis")?,
        };
        f.finish()?;
        Ok(identification)
    }
}

/// Input and output modalities a capability supports.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportedLayers {
    /// Input modality tags.
    pub input: Vec<String>,
    /// Output modality tags.
    pub output: Vec<String>,
}

impl Default for SupportedLayers {
    fn default() -> Self {
        Self {
            input: vec![TEXT_LAYER.to_string()],
            output: vec![TEXT_LAYER.to_string()],
        }
    }
}

impl SupportedLayers {
    /// Layers with explicit inputs and outputs.
    pub fn new<I, O>(input: I, output: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            input: dedup(input),
            output: dedup(output),
        }
    }
}

/// Keep first occurrences only; layers are ordered sets.
fn dedup<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.into();
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

impl Record for SupportedLayers {
    const NAME: &'static str = "SupportedLayers";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.field("input", &self.input)?;
        p.field("output", &self.output)?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let defaults = Self::default();
        let input: Option<Vec<String>> = f.optional("input")?;
        let output: Option<Vec<String>> = f.optional("output")?;
        f.finish()?;
        Ok(Self::new(
            input.unwrap_or(defaults.input),
            output.unwrap_or(defaults.output),
        ))
    }
}

/// One advertised skill.
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    /// Phrases that describe when to use this capability.
    pub keyphrases: Vec<String>,
    /// Human-readable descriptions.
    pub descriptions: Vec<String>,
    /// Supported BCP 47 languages, if restricted.
    pub languages: Option<Vec<String>>,
    /// Supported modalities. Defaults to text in, text out.
    pub supported_layers: SupportedLayers,
}

impl Capability {
    /// A capability with default (text) layers and no language restriction.
    pub fn new<K, D>(keyphrases: K, descriptions: D) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            keyphrases: keyphrases.into_iter().map(Into::into).collect(),
            descriptions: descriptions.into_iter().map(Into::into).collect(),
            languages: None,
            supported_layers: SupportedLayers::default(),
        }
    }

    /// Restrict to the given languages.
    pub fn with_languages<L>(mut self, languages: L) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    /// Set the supported layers.
    pub fn with_supported_layers(mut self, layers: SupportedLayers) -> Self {
        self.supported_layers = layers;
        self
    }
}

impl Record for Capability {
    const NAME: &'static str = "Capability";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.field("keyphrases", &self.keyphrases)?;
        p.field("descriptions", &self.descriptions)?;
        p.optional("languages", self.languages.as_ref())?;
        p.record("supportedLayers", &self.supported_layers)?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let capability = Self {
            keyphrases: f.required("keyphrases")?,
            descriptions: f.required("descriptions")?,
            languages: f.optional("languages")?,
            supported_layers: f.optional_record("supportedLayers")?.unwrap_or_default(),
        };
        f.finish()?;
        Ok(capability)
    }
}

/// Full capability declaration of an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Who the agent is.
    pub identification: Identification,
    /// What the agent can do.
    pub capabilities: Vec<Capability>,
}

impl Manifest {
    /// Create a manifest.
    pub fn new(identification: Identification, capabilities: Vec<Capability>) -> Self {
        Self {
            identification,
            capabilities,
        }
    }

    /// Shorthand for `identification.speaker_uri`.
    pub fn speaker_uri(&self) -> &str {
        &self.identification.speaker_uri
    }

    /// Shorthand for `identification.service_url`.
    pub fn service_url(&self) -> &str {
        &self.identification.service_url
    }
}

impl Record for Manifest {
    const NAME: &'static str = "Manifest";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.record("identification", &self.identification)?;
        p.records("capabilities", &self.capabilities)?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let identification = f.required_record("identification")?;
        let capabilities = f.records("capabilities")?;
        f.finish()?;
        Ok(Self {
            identification,
            capabilities,
        })
    }
}

record_serde!(Identification, SupportedLayers, Capability, Manifest);
