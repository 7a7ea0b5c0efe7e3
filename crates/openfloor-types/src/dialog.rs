//! Dialog primitives: spans, tokens, features, dialog events and history.
//!
//! A [`DialogEvent`] is one conversational turn. Its content is split into
//! named [`Feature`]s (e.g. `"text"`), each an ordered list of [`Token`]s,
//! with optional [`Span`] timing at both levels.

use crate::duration::{format_iso_duration, parse_iso_duration};
use crate::error::{OpenFloorResult, ValidationError};
use crate::feature_registry::{FeatureRegistry, TEXT_PLAIN};
use crate::record::{project_list, record_serde, reconstruct_list, Fields, Projection, Record};
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

/// Encodings a feature may declare.
pub const SUPPORTED_ENCODINGS: [&str; 2] = ["ISO-8859-1", "UTF-8"];

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// A time interval, absolute (`startTime`/`endTime`, ISO 8601 timestamps) or
/// relative (`startOffset`/`endOffset`, ISO 8601 durations).
///
/// Exactly one start form must be set; at most one end form.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// Absolute start timestamp.
    pub start_time: Option<String>,
    /// Start offset as an ISO 8601 duration.
    pub start_offset: Option<String>,
    /// Absolute end timestamp.
    pub end_time: Option<String>,
    /// End offset as an ISO 8601 duration.
    pub end_offset: Option<String>,
}

impl Span {
    /// Create a span from all four forms, validating the combination.
    pub fn new(
        start_time: Option<String>,
        start_offset: Option<String>,
        end_time: Option<String>,
        end_offset: Option<String>,
    ) -> OpenFloorResult<Self> {
        let span = Self {
            start_time,
            start_offset,
            end_time,
            end_offset,
        };
        span.validate()?;
        Ok(span)
    }

    /// A span starting at an absolute timestamp.
    pub fn starting_at(start_time: impl Into<String>) -> Self {
        Self {
            start_time: Some(start_time.into()),
            start_offset: None,
            end_time: None,
            end_offset: None,
        }
    }

    /// A span starting at a relative offset.
    pub fn starting_after(start_offset: impl Into<String>) -> Self {
        Self {
            start_time: None,
            start_offset: Some(start_offset.into()),
            end_time: None,
            end_offset: None,
        }
    }

    /// A span starting now (UTC, RFC 3339).
    pub fn now() -> Self {
        Self::starting_at(Utc::now().to_rfc3339())
    }

    /// A relative span from millisecond offsets.
    pub fn from_offsets_ms(start_ms: u64, end_ms: Option<u64>) -> Self {
        Self {
            start_time: None,
            start_offset: Some(format_iso_duration(Duration::from_millis(start_ms))),
            end_time: None,
            end_offset: end_ms.map(|ms| format_iso_duration(Duration::from_millis(ms))),
        }
    }

    /// Set an absolute end.
    pub fn ending_at(mut self, end_time: impl Into<String>) -> OpenFloorResult<Self> {
        self.end_time = Some(end_time.into());
        self.validate()?;
        Ok(self)
    }

    /// Set a relative end.
    pub fn ending_after(mut self, end_offset: impl Into<String>) -> OpenFloorResult<Self> {
        self.end_offset = Some(end_offset.into());
        self.validate()?;
        Ok(self)
    }

    /// Check the start/end exclusivity rules.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_time.is_some() && self.start_offset.is_some() {
            return Err(ValidationError::BothStartForms);
        }
        if self.end_time.is_some() && self.end_offset.is_some() {
            return Err(ValidationError::BothEndForms);
        }
        if self.start_time.is_none() && self.start_offset.is_none() {
            return Err(ValidationError::MissingStart);
        }
        Ok(())
    }

    /// The start timestamp, if absolute and RFC 3339.
    pub fn start_datetime(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(self.start_time.as_deref()?)
    }

    /// The end timestamp, if absolute and RFC 3339.
    pub fn end_datetime(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(self.end_time.as_deref()?)
    }

    /// The start offset, if relative and well-formed.
    pub fn start_duration(&self) -> Option<Duration> {
        parse_iso_duration(self.start_offset.as_deref()?)
    }

    /// The end offset, if relative and well-formed.
    pub fn end_duration(&self) -> Option<Duration> {
        parse_iso_duration(self.end_offset.as_deref()?)
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

impl Record for Span {
    const NAME: &'static str = "Span";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.optional("startTime", self.start_time.as_ref())?;
        p.optional("startOffset", self.start_offset.as_ref())?;
        p.optional("endTime", self.end_time.as_ref())?;
        p.optional("endOffset", self.end_offset.as_ref())?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let start_time = f.optional("startTime")?;
        let start_offset = f.optional("startOffset")?;
        let end_time = f.optional("endTime")?;
        let end_offset = f.optional("endOffset")?;
        f.finish()?;
        Self::new(start_time, start_offset, end_time, end_offset)
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// One atomic unit of feature content.
///
/// Carries either an inline `value` (any JSON) or a `valueUrl` pointing at
/// the content, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Inline value.
    pub value: Option<Value>,
    /// URL of the value.
    pub value_url: Option<String>,
    /// Timing of this token.
    pub span: Option<Span>,
    /// Recognizer confidence in `[0, 1]`.
    pub confidence: Option<f64>,
    /// Path references into the owning dialog event's features, kept verbatim.
    pub links: Vec<String>,
}

impl Token {
    /// A token with an inline value. JSON `null` counts as no value.
    pub fn from_value(value: impl Into<Value>) -> OpenFloorResult<Self> {
        let value = value.into();
        let token = Self {
            value: (!value.is_null()).then_some(value),
            value_url: None,
            span: None,
            confidence: None,
            links: Vec::new(),
        };
        token.validate()?;
        Ok(token)
    }

    /// A token whose value lives at a URL.
    pub fn from_url(value_url: impl Into<String>) -> Self {
        Self {
            value: None,
            value_url: Some(value_url.into()),
            span: None,
            confidence: None,
            links: Vec::new(),
        }
    }

    /// Set the confidence, rejecting values outside `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f64) -> OpenFloorResult<Self> {
        self.confidence = Some(confidence);
        self.validate()?;
        Ok(self)
    }

    /// Set the token's span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Append a link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    /// The inline value, treating JSON `null` as absent.
    pub fn inline_value(&self) -> Option<&Value> {
        self.value.as_ref().filter(|v| !v.is_null())
    }

    /// Check value exclusivity and the confidence range.
    ///
    /// An explicit `Some(Value::Null)` is rejected: on the wire `null` reads
    /// back as no value at all.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(self.value, Some(Value::Null)) {
            return Err(ValidationError::NullTokenValue);
        }
        match (self.inline_value().is_some(), self.value_url.is_some()) {
            (false, false) => return Err(ValidationError::MissingTokenValue),
            (true, true) => return Err(ValidationError::BothTokenValues),
            _ => {}
        }
        if let Some(c) = self.confidence {
            // NaN fails `contains` too.
            if !(0.0..=1.0).contains(&c) {
                return Err(ValidationError::ConfidenceOutOfRange(c));
            }
        }
        Ok(())
    }
}

impl Record for Token {
    const NAME: &'static str = "Token";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.optional("value", self.inline_value())?;
        p.optional("valueUrl", self.value_url.as_ref())?;
        p.optional_record("span", self.span.as_ref())?;
        p.optional("confidence", self.confidence.as_ref())?;
        p.non_empty("links", &self.links)?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let token = Self {
            value: f.raw("value"),
            value_url: f.optional("valueUrl")?,
            span: f.optional_record("span")?,
            confidence: f.optional("confidence")?,
            links: f.optional("links")?.unwrap_or_default(),
        };
        f.finish()?;
        token.validate()?;
        Ok(token)
    }
}

// ---------------------------------------------------------------------------
// Feature
// ---------------------------------------------------------------------------

/// A typed channel of content within a turn, e.g. plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Content mime type. Defaults to `text/plain`.
    pub mime_type: String,
    /// The primary token sequence.
    pub tokens: Vec<Token>,
    /// Alternate token sequences (e.g. n-best recognition results).
    pub alternates: Vec<Vec<Token>>,
    /// BCP 47 language tag.
    pub lang: Option<String>,
    /// Character encoding, `ISO-8859-1` or `UTF-8`.
    pub encoding: Option<String>,
    /// Tokenizer description.
    pub token_schema: Option<String>,
}

impl Default for Feature {
    fn default() -> Self {
        Self {
            mime_type: TEXT_PLAIN.to_string(),
            tokens: Vec::new(),
            alternates: Vec::new(),
            lang: None,
            encoding: None,
            token_schema: None,
        }
    }
}

impl Feature {
    /// A feature of the given mime type and tokens.
    pub fn new(mime_type: impl Into<String>, tokens: Vec<Token>) -> OpenFloorResult<Self> {
        let feature = Self {
            mime_type: mime_type.into(),
            tokens,
            ..Self::default()
        };
        feature.validate()?;
        Ok(feature)
    }

    /// A `text/plain` feature with one token per value.
    pub fn text<I, S>(values: I) -> OpenFloorResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = values
            .into_iter()
            .map(|v| Token::from_value(Value::String(v.into())))
            .collect::<OpenFloorResult<Vec<_>>>()?;
        Self::new(TEXT_PLAIN, tokens)
    }

    /// Set the language tag.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Set the encoding, rejecting anything but `ISO-8859-1` and `UTF-8`.
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> OpenFloorResult<Self> {
        self.encoding = Some(encoding.into());
        self.validate()?;
        Ok(self)
    }

    /// Set the token schema.
    pub fn with_token_schema(mut self, token_schema: impl Into<String>) -> Self {
        self.token_schema = Some(token_schema.into());
        self
    }

    /// Add an alternate token sequence.
    pub fn with_alternate(mut self, alternate: Vec<Token>) -> OpenFloorResult<Self> {
        self.alternates.push(alternate);
        self.validate()?;
        Ok(self)
    }

    /// String values of the primary tokens, skipping non-string and URL tokens.
    pub fn text_values(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|t| t.inline_value().and_then(Value::as_str))
            .collect()
    }

    /// Validate against the global feature registry.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_with(FeatureRegistry::global())
    }

    /// Validate the encoding and the registered content rules.
    pub fn validate_with(&self, registry: &FeatureRegistry) -> Result<(), ValidationError> {
        if let Some(encoding) = &self.encoding {
            if !SUPPORTED_ENCODINGS.contains(&encoding.as_str()) {
                return Err(ValidationError::UnsupportedEncoding(encoding.clone()));
            }
        }
        registry.check(self)
    }

    /// Reconstruct against a caller-supplied registry.
    pub fn reconstruct_with(value: Value, registry: &FeatureRegistry) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let feature = Self {
            mime_type: f
                .optional("mimeType")?
                .unwrap_or_else(|| TEXT_PLAIN.to_string()),
            tokens: f.records("tokens")?,
            alternates: f.record_lists("alternates")?,
            lang: f.optional("lang")?,
            encoding: f.optional("encoding")?,
            token_schema: f.optional("tokenSchema")?,
        };
        f.finish()?;
        feature.validate_with(registry)?;
        Ok(feature)
    }
}

impl Record for Feature {
    const NAME: &'static str = "Feature";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.field("mimeType", &self.mime_type)?;
        p.records("tokens", &self.tokens)?;
        if !self.alternates.is_empty() {
            let alternates = self
                .alternates
                .iter()
                .map(|alt| project_list(alt.as_slice()))
                .collect::<OpenFloorResult<Vec<_>>>()?;
            p.value("alternates", Value::Array(alternates));
        }
        p.optional("lang", self.lang.as_ref())?;
        p.optional("encoding", self.encoding.as_ref())?;
        p.optional("tokenSchema", self.token_schema.as_ref())?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        Self::reconstruct_with(value, FeatureRegistry::global())
    }
}

// ---------------------------------------------------------------------------
// FeatureMap
// ---------------------------------------------------------------------------

/// Features of a dialog event, keyed by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMap {
    entries: Vec<(String, Feature)>,
}

impl FeatureMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature, replacing (in place) any feature of the same name.
    pub fn insert(&mut self, name: impl Into<String>, feature: Feature) -> Option<Feature> {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, feature)),
            None => {
                self.entries.push((name, feature));
                None
            }
        }
    }

    /// Look up a feature by name.
    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    /// Remove a feature by name.
    pub fn remove(&mut self, name: &str) -> Option<Feature> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no features.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, feature)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Feature)> {
        self.entries.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Feature names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    fn project(&self) -> OpenFloorResult<Value> {
        let mut map = Map::new();
        for (name, feature) in &self.entries {
            map.insert(name.clone(), feature.project()?);
        }
        Ok(Value::Object(map))
    }
}

impl<K: Into<String>> FromIterator<(K, Feature)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (K, Feature)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, feature) in iter {
            map.insert(name, feature);
        }
        map
    }
}

// ---------------------------------------------------------------------------
// DialogEvent
// ---------------------------------------------------------------------------

/// One conversational turn.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogEvent {
    /// Unique id of this turn.
    pub id: String,
    /// Who spoke.
    pub speaker_uri: String,
    /// When the turn happened.
    pub span: Span,
    /// Named content channels; never empty.
    pub features: FeatureMap,
    /// Id of the turn this one follows. A reference, not ownership.
    pub previous_id: Option<String>,
    /// Free-form context.
    pub context: Option<String>,
}

impl DialogEvent {
    /// Create a dialog event. Fails if `features` is empty.
    pub fn new(
        id: impl Into<String>,
        speaker_uri: impl Into<String>,
        span: Span,
        features: FeatureMap,
    ) -> OpenFloorResult<Self> {
        let event = Self {
            id: id.into(),
            speaker_uri: speaker_uri.into(),
            span,
            features,
            previous_id: None,
            context: None,
        };
        event.validate()?;
        Ok(event)
    }

    /// A fresh dialog event id (`de:<uuid>`).
    pub fn generate_id() -> String {
        format!("de:{}", Uuid::new_v4())
    }

    /// Set the back-reference to the previous turn.
    pub fn with_previous_id(mut self, previous_id: impl Into<String>) -> Self {
        self.previous_id = Some(previous_id.into());
        self
    }

    /// Set the context string.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Look up a feature by name.
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    /// The projected feature map as a plain JSON tree, for resolving token
    /// links with an external path-query tool.
    pub fn features_tree(&self) -> OpenFloorResult<Value> {
        self.features.project()
    }

    /// Check the feature map is non-empty and the span is valid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.span.validate()?;
        if self.features.is_empty() {
            return Err(ValidationError::NoFeatures);
        }
        Ok(())
    }
}

impl Record for DialogEvent {
    const NAME: &'static str = "DialogEvent";

    fn project(&self) -> OpenFloorResult<Value> {
        let mut p = Projection::new();
        p.field("id", &self.id)?;
        p.field("speakerUri", &self.speaker_uri)?;
        p.record("span", &self.span)?;
        p.value("features", self.features.project()?);
        p.optional("previousId", self.previous_id.as_ref())?;
        p.optional("context", self.context.as_ref())?;
        Ok(p.finish())
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        let mut f = Fields::new(Self::NAME, value)?;
        let id = f.required("id")?;
        let speaker_uri = f.required("speakerUri")?;
        let span = f.required_record("span")?;
        let features = f
            .object("features")?
            .into_iter()
            .map(|(name, v)| Feature::reconstruct(v).map(|feature| (name, feature)))
            .collect::<OpenFloorResult<FeatureMap>>()?;
        let previous_id = f.optional("previousId")?;
        let context = f.optional("context")?;
        f.finish()?;

        let event = Self {
            id,
            speaker_uri,
            span,
            features,
            previous_id,
            context,
        };
        event.validate()?;
        Ok(event)
    }
}

// ---------------------------------------------------------------------------
// DialogHistory
// ---------------------------------------------------------------------------

/// Ordered record of turns. Projects to a JSON array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogHistory {
    events: Vec<DialogEvent>,
}

impl DialogHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn push(&mut self, event: DialogEvent) {
        self.events.push(event);
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate turns in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DialogEvent> {
        self.events.iter()
    }

    /// The most recent turn.
    pub fn last(&self) -> Option<&DialogEvent> {
        self.events.last()
    }

    /// Find a turn by id.
    pub fn get(&self, id: &str) -> Option<&DialogEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// The turn `event` follows, resolved through its `previousId`.
    pub fn previous_of(&self, event: &DialogEvent) -> Option<&DialogEvent> {
        self.get(event.previous_id.as_deref()?)
    }

    /// Borrow the turns as a slice.
    pub fn as_slice(&self) -> &[DialogEvent] {
        &self.events
    }
}

impl From<Vec<DialogEvent>> for DialogHistory {
    fn from(events: Vec<DialogEvent>) -> Self {
        Self { events }
    }
}

impl IntoIterator for DialogHistory {
    type Item = DialogEvent;
    type IntoIter = std::vec::IntoIter<DialogEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a DialogHistory {
    type Item = &'a DialogEvent;
    type IntoIter = std::slice::Iter<'a, DialogEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl Record for DialogHistory {
    const NAME: &'static str = "DialogHistory";

    fn project(&self) -> OpenFloorResult<Value> {
        project_list(&self.events)
    }

    fn reconstruct(value: Value) -> OpenFloorResult<Self> {
        reconstruct_list(Self::NAME, "<root>", value).map(|events| Self { events })
    }
}

record_serde!(Span, Token, Feature, DialogEvent, DialogHistory);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_event(id: &str) -> DialogEvent {
        let features: FeatureMap = vec![("text", Feature::text(["hello", "world"]).unwrap())]
            .into_iter()
            .collect();
        DialogEvent::new(
            id,
            "tag:user",
            Span::starting_at("2025-01-01T12:00:00+00:00"),
            features,
        )
        .unwrap()
    }

    // -- Span ---------------------------------------------------------------

    #[test]
    fn test_span_both_start_forms_rejected() {
        let err = Span::new(Some("2025-01-01T00:00:00Z".into()), Some("PT1S".into()), None, None)
            .unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::BothStartForms));
    }

    #[test]
    fn test_span_no_start_rejected() {
        let err = Span::new(None, None, Some("2025-01-01T00:00:00Z".into()), None).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::MissingStart));
    }

    #[test]
    fn test_span_both_end_forms_rejected() {
        let err = Span::starting_after("PT0S")
            .ending_at("2025-01-01T00:00:00Z")
            .unwrap()
            .ending_after("PT2S")
            .unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::BothEndForms));
    }

    #[test]
    fn test_span_offsets_only() {
        let span = Span::new(None, Some("PT0.5S".into()), None, Some("PT2S".into())).unwrap();
        assert_eq!(
            span.project().unwrap(),
            json!({"startOffset": "PT0.5S", "endOffset": "PT2S"})
        );
        assert_eq!(span.start_duration(), Some(Duration::from_millis(500)));
        assert_eq!(span.end_duration(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_span_from_offsets_ms() {
        let span = Span::from_offsets_ms(1500, Some(4000));
        assert_eq!(span.start_offset.as_deref(), Some("PT1.5S"));
        assert_eq!(span.end_offset.as_deref(), Some("PT4S"));
        assert!(span.validate().is_ok());
    }

    #[test]
    fn test_span_now_is_parseable() {
        let span = Span::now();
        assert!(span.start_datetime().is_some());
        assert!(span.end_datetime().is_none());
    }

    #[test]
    fn test_span_reconstruct_runs_validation() {
        let err = Span::reconstruct(json!({"startTime": "t", "startOffset": "PT1S"})).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::BothStartForms));
        let err = Span::reconstruct(json!({})).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::MissingStart));
    }

    // -- Token --------------------------------------------------------------

    #[test]
    fn test_token_confidence_bounds() {
        assert!(Token::from_value("hi").unwrap().with_confidence(1.0).is_ok());
        assert!(Token::from_value("hi").unwrap().with_confidence(0.0).is_ok());

        let err = Token::from_value("hi").unwrap().with_confidence(1.01).unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::ConfidenceOutOfRange(1.01))
        );
        let err = Token::from_value("hi").unwrap().with_confidence(-0.1).unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::ConfidenceOutOfRange(-0.1))
        );
        assert!(Token::from_value("hi")
            .unwrap()
            .with_confidence(f64::NAN)
            .is_err());
    }

    #[test]
    fn test_token_value_exclusivity() {
        let err = Token::reconstruct(json!({"value": "a", "valueUrl": "https://x/a"})).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::BothTokenValues));

        let err = Token::reconstruct(json!({"confidence": 0.5})).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::MissingTokenValue));

        let err = Token::from_value(Value::Null).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::MissingTokenValue));
    }

    #[test]
    fn test_token_null_value_rejected() {
        let token = Token {
            value: Some(Value::Null),
            ..Token::from_url("https://x/a")
        };
        assert_eq!(token.validate(), Err(ValidationError::NullTokenValue));

        let token = Token::reconstruct(json!({"value": null, "valueUrl": "https://x/a"})).unwrap();
        assert_eq!(token.value, None);
        assert_eq!(Token::reconstruct(token.project().unwrap()).unwrap(), token);
    }

    #[test]
    fn test_token_projection_order_and_omission() {
        let token = Token::from_value("hello")
            .unwrap()
            .with_span(Span::starting_after("PT1S"))
            .with_confidence(0.9)
            .unwrap()
            .with_link("$.text.tokens[0]");
        let projected = token.project().unwrap();
        let keys: Vec<_> = projected.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["value", "span", "confidence", "links"]);

        let bare = Token::from_url("https://x/t").project().unwrap();
        assert_eq!(bare, json!({"valueUrl": "https://x/t"}));
    }

    #[test]
    fn test_token_structured_value_roundtrip() {
        let token = Token::from_value(json!({"intent": "greet", "slots": [1, 2]})).unwrap();
        let back = Token::reconstruct(token.project().unwrap()).unwrap();
        assert_eq!(back, token);
    }

    // -- Feature ------------------------------------------------------------

    #[test]
    fn test_feature_encoding() {
        assert!(Feature::default().with_encoding("UTF-8").is_ok());
        assert!(Feature::default().with_encoding("ISO-8859-1").is_ok());
        let err = Feature::default().with_encoding("UTF-16").unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::UnsupportedEncoding("UTF-16".to_string()))
        );
    }

    #[test]
    fn test_feature_default_mime_type() {
        let feature = Feature::reconstruct(json!({"tokens": [{"value": "hi"}]})).unwrap();
        assert_eq!(feature.mime_type, "text/plain");
        assert_eq!(
            feature.project().unwrap(),
            json!({"mimeType": "text/plain", "tokens": [{"value": "hi"}]})
        );
    }

    #[test]
    fn test_feature_tokens_always_emitted() {
        let projected = Feature::default().project().unwrap();
        assert_eq!(projected, json!({"mimeType": "text/plain", "tokens": []}));
    }

    #[test]
    fn test_feature_alternates_roundtrip() {
        let feature = Feature::text(["to", "two"])
            .unwrap()
            .with_alternate(vec![Token::from_value("too").unwrap()])
            .unwrap()
            .with_lang("en-US")
            .with_token_schema("whitespace");
        let projected = feature.project().unwrap();
        assert_eq!(projected["alternates"], json!([[{"value": "too"}]]));
        assert_eq!(Feature::reconstruct(projected).unwrap(), feature);
        assert_eq!(feature.text_values(), vec!["to", "two"]);
    }

    #[test]
    fn test_feature_reconstruct_with_custom_registry() {
        fn urls_only(f: &Feature) -> Result<(), String> {
            if f.tokens.iter().all(|t| t.value_url.is_some()) {
                Ok(())
            } else {
                Err("inline audio is not allowed".to_string())
            }
        }
        let mut registry = FeatureRegistry::with_defaults();
        registry.register("audio/wav", urls_only);

        let input = json!({"mimeType": "audio/wav", "tokens": [{"value": "AAAA"}]});
        assert!(Feature::reconstruct(input.clone()).is_ok());
        let err = Feature::reconstruct_with(input, &registry).unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::FeatureContent { .. })
        ));
    }

    #[test]
    fn test_feature_alternates_wrong_shape() {
        let err = Feature::reconstruct(json!({"alternates": {"a": 1}})).unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::WrongShape { field, .. }) if field == "alternates"
        ));
    }

    // -- DialogEvent --------------------------------------------------------

    #[test]
    fn test_dialog_event_requires_feature() {
        let err = DialogEvent::new("de:1", "tag:user", Span::now(), FeatureMap::new()).unwrap_err();
        assert_eq!(err.validation(), Some(&ValidationError::NoFeatures));
    }

    #[test]
    fn test_dialog_event_omits_previous_id() {
        let event = text_event("de:1");
        let projected = event.project().unwrap();
        assert!(projected.get("previousId").is_none());
        assert!(projected.get("context").is_none());
        let keys: Vec<_> = projected.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["id", "speakerUri", "span", "features"]);
    }

    #[test]
    fn test_dialog_event_roundtrip_keeps_feature_order() {
        let mut features = FeatureMap::new();
        features.insert("text", Feature::text(["hi"]).unwrap());
        features.insert(
            "intent",
            Feature::new(
                "application/json",
                vec![Token::from_value(json!({"name": "greet"})).unwrap()],
            )
            .unwrap(),
        );
        let event = DialogEvent::new("de:2", "tag:user", Span::starting_after("PT0S"), features)
            .unwrap()
            .with_previous_id("de:1")
            .with_context("demo");

        let projected = event.project().unwrap();
        let names: Vec<_> = projected["features"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(names, vec!["text", "intent"]);
        assert_eq!(DialogEvent::reconstruct(projected).unwrap(), event);
    }

    #[test]
    fn test_dialog_event_missing_span() {
        let err = DialogEvent::reconstruct(json!({
            "id": "de:1",
            "speakerUri": "tag:user",
            "features": {"text": {"tokens": [{"value": "hi"}]}}
        }))
        .unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::MissingField {
                record: "DialogEvent",
                field: "span"
            })
        );
    }

    #[test]
    fn test_dialog_event_nested_error_propagates() {
        let err = DialogEvent::reconstruct(json!({
            "id": "de:1",
            "speakerUri": "tag:user",
            "span": {"startTime": "2025-01-01T00:00:00Z"},
            "features": {"text": {"tokens": [{"value": "hi", "confidence": 2.0}]}}
        }))
        .unwrap_err();
        assert_eq!(
            err.validation(),
            Some(&ValidationError::ConfidenceOutOfRange(2.0))
        );
    }

    #[test]
    fn test_features_tree_for_link_resolution() {
        let event = text_event("de:1");
        let tree = event.features_tree().unwrap();
        assert_eq!(tree["text"]["tokens"][1]["value"], json!("world"));
    }

    #[test]
    fn test_generate_id_prefix() {
        let a = DialogEvent::generate_id();
        let b = DialogEvent::generate_id();
        assert!(a.starts_with("de:"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_feature_map_insert_replaces_in_place() {
        let mut features = FeatureMap::new();
        features.insert("a", Feature::default());
        features.insert("b", Feature::default());
        let old = features.insert("a", Feature::text(["x"]).unwrap());
        assert!(old.is_some());
        assert_eq!(features.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(features.get("a").unwrap().text_values(), vec!["x"]);
        assert!(features.remove("b").is_some());
        assert_eq!(features.len(), 1);
    }

    // -- DialogHistory ------------------------------------------------------

    #[test]
    fn test_history_projects_to_array() {
        let mut history = DialogHistory::new();
        history.push(text_event("de:1"));
        history.push(text_event("de:2").with_previous_id("de:1"));
        let projected = history.project().unwrap();
        assert_eq!(projected.as_array().unwrap().len(), 2);
        assert_eq!(DialogHistory::reconstruct(projected).unwrap(), history);
    }

    #[test]
    fn test_history_previous_of() {
        let history = DialogHistory::from(vec![
            text_event("de:1"),
            text_event("de:2").with_previous_id("de:1"),
        ]);
        let last = history.last().unwrap();
        assert_eq!(history.previous_of(last).unwrap().id, "de:1");
        assert!(history.previous_of(history.get("de:1").unwrap()).is_none());
    }

    #[test]
    fn test_history_rejects_object() {
        let err = DialogHistory::reconstruct(json!({"id": "de:1"})).unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::WrongShape {
                record: "DialogHistory",
                ..
            })
        ));
    }
}
