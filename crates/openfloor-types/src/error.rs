//! Error types for record construction, reconstruction and projection.

use thiserror::Error;

/// A violated record invariant or malformed input shape.
///
/// Every rule a record checks at construction time has its own variant, so
/// callers (and tests) can tell exactly which precondition failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A span was given both `startTime` and `startOffset`.
    #[error("Cannot specify both startTime and startOffset")]
    BothStartForms,

    /// A span was given both `endTime` and `endOffset`.
    #[error("Cannot specify both endTime and endOffset")]
    BothEndForms,

    /// A span was given neither `startTime` nor `startOffset`.
    #[error("Must specify either startTime or startOffset")]
    MissingStart,

    /// A token was given neither `value` nor `valueUrl`.
    #[error("Must specify either value or valueUrl")]
    MissingTokenValue,

    /// A token was given both `value` and `valueUrl`.
    #[error("Cannot specify both value and valueUrl")]
    BothTokenValues,

    /// A token's inline value was set to JSON `null` instead of left unset.
    #[error("Token value must not be null; leave it unset instead")]
    NullTokenValue,

    /// A token confidence fell outside `[0, 1]`.
    #[error("Confidence must be between 0 and 1 (got {0})")]
    ConfidenceOutOfRange(f64),

    /// A feature declared an encoding other than `ISO-8859-1` or `UTF-8`.
    #[error("Encoding must be either 'ISO-8859-1' or 'UTF-8' (got '{0}')")]
    UnsupportedEncoding(String),

    /// A feature's content does not fit its registered mime type.
    #[error("Invalid {mime_type} feature: {reason}")]
    FeatureContent {
        /// The feature's mime type.
        mime_type: String,
        /// What the mime type's validator rejected.
        reason: String,
    },

    /// A dialog event carried an empty feature map.
    #[error("Dialog event must contain at least one feature")]
    NoFeatures,

    /// A `to` block named neither a speakerUri nor a serviceUrl.
    #[error("Must specify either speakerUri or serviceUrl")]
    NoAddress,

    /// A required field was absent or null.
    #[error("{record} is missing required field '{field}'")]
    MissingField {
        /// The record being reconstructed.
        record: &'static str,
        /// The wire name of the missing field.
        field: &'static str,
    },

    /// A field was present but had the wrong JSON shape.
    #[error("{record}.{field} has the wrong shape: {reason}")]
    WrongShape {
        /// The record being reconstructed.
        record: &'static str,
        /// The wire name of the offending field.
        field: String,
        /// What was expected.
        reason: String,
    },

    /// A field not declared by the record was present.
    #[error("{record} has unexpected field '{field}'")]
    UnknownField {
        /// The record being reconstructed.
        record: &'static str,
        /// The unexpected key.
        field: String,
    },
}

/// Top-level error type for the Open Floor data model.
#[derive(Error, Debug)]
pub enum OpenFloorError {
    /// A record invariant was violated or the input was malformed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A value could not be projected into JSON.
    #[error("Unsupported value of type {type_name}: {reason}")]
    Unsupported {
        /// The Rust type that failed to project.
        type_name: &'static str,
        /// Why the conversion failed.
        reason: String,
    },
}

impl OpenFloorError {
    /// The violated rule, if this is a validation failure.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(v) => Some(v),
            _ => None,
        }
    }
}

/// Alias for Result with OpenFloorError.
pub type OpenFloorResult<T> = Result<T, OpenFloorError>;
