//! Codec settings, loaded from a TOML file with defaults.

use crate::error::{WireError, WireResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default upper bound on documents read from a reader or file (16 MB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

/// Widest indent accepted for pretty output.
pub const MAX_INDENT: usize = 16;

/// How records are written and how much input is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Pretty-print JSON output. Default: true.
    pub pretty: bool,
    /// Spaces per indent level when pretty. Default: 2.
    pub indent: usize,
    /// Largest document accepted when decoding. Default: 16 MB.
    pub max_document_bytes: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 2,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl CodecConfig {
    /// Single-line output, otherwise default settings.
    pub fn compact() -> Self {
        Self {
            pretty: false,
            ..Self::default()
        }
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> WireResult<()> {
        if self.indent > MAX_INDENT {
            return Err(WireError::Config(format!(
                "indent must be at most {MAX_INDENT} (got {})",
                self.indent
            )));
        }
        if self.max_document_bytes == 0 {
            return Err(WireError::Config(
                "max_document_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate codec settings from TOML text.
pub fn parse_config(contents: &str) -> WireResult<CodecConfig> {
    let config: CodecConfig =
        toml::from_str(contents).map_err(|e| WireError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load codec settings from a TOML file, with defaults.
///
/// A missing file, an unreadable file and invalid settings all fall back to
/// [`CodecConfig::default`].
pub fn load_config(path: &Path) -> CodecConfig {
    if !path.exists() {
        info!(path = %path.display(), "Codec config not found, using defaults");
        return CodecConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match parse_config(&contents) {
            Ok(config) => {
                info!(
                    path = %path.display(),
                    pretty = config.pretty,
                    max_document_bytes = config.max_document_bytes,
                    "Loaded codec config"
                );
                return config;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    "Invalid codec config, using defaults"
                );
            }
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "Failed to read codec config, using defaults"
            );
        }
    }

    CodecConfig::default()
}
