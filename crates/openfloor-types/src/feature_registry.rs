//! Mime-type registry for feature content rules.
//!
//! A [`FeatureRegistry`] maps a mime type to a [`FeatureKind`], whose
//! validator runs once whenever a feature of that type is constructed or
//! reconstructed. Mime types with no registered kind are accepted as plain
//! generic features.

use crate::dialog::Feature;
use crate::error::ValidationError;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Mime type of plain-text features.
pub const TEXT_PLAIN: &str = "text/plain";

/// Content check for one mime type. Returns the reason on rejection.
pub type FeatureValidator = fn(&Feature) -> Result<(), String>;

/// A registered feature kind.
#[derive(Debug, Clone)]
pub struct FeatureKind {
    /// Normalized mime type this kind handles.
    pub mime_type: String,
    validator: FeatureValidator,
}

impl FeatureKind {
    /// Run this kind's content check.
    pub fn check(&self, feature: &Feature) -> Result<(), ValidationError> {
        (self.validator)(feature).map_err(|reason| ValidationError::FeatureContent {
            mime_type: self.mime_type.clone(),
            reason,
        })
    }
}

/// Registry of feature kinds keyed by mime type.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    kinds: HashMap<String, FeatureKind>,
}

impl FeatureRegistry {
    /// Create a registry with no kinds at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in kinds (`text/plain`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(TEXT_PLAIN, validate_text_plain);
        registry
    }

    /// The process-wide default registry used by `Feature::validate` and
    /// `Feature::reconstruct`.
    pub fn global() -> &'static FeatureRegistry {
        static GLOBAL: OnceLock<FeatureRegistry> = OnceLock::new();
        GLOBAL.get_or_init(FeatureRegistry::with_defaults)
    }

    /// Register (or replace) the kind for a mime type.
    pub fn register(&mut self, mime_type: &str, validator: FeatureValidator) {
        let mime_type = normalize_mime(mime_type);
        self.kinds.insert(
            mime_type.clone(),
            FeatureKind {
                mime_type,
                validator,
            },
        );
    }

    /// Look up the kind for a mime type. Parameters and case are ignored.
    pub fn get(&self, mime_type: &str) -> Option<&FeatureKind> {
        self.kinds.get(&normalize_mime(mime_type))
    }

    /// Run the registered check for `feature`, if its mime type has one.
    pub fn check(&self, feature: &Feature) -> Result<(), ValidationError> {
        match self.get(&feature.mime_type) {
            Some(kind) => kind.check(feature),
            None => Ok(()),
        }
    }

    /// Registered mime types.
    pub fn mime_types(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

/// `text/plain; charset=UTF-8` -> `text/plain`
fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Text content carries no rules beyond the encoding check every feature
/// gets; token values may be any JSON.
fn validate_text_plain(_feature: &Feature) -> Result<(), String> {
    Ok(())
}
