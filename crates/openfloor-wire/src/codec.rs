//! JSON text encoding for records.
//!
//! Encoding projects a record and serializes the projection, so field order
//! and omission follow the record's own rules. Decoding parses untyped JSON
//! first and then reconstructs, so a malformed document and an invalid
//! record surface as different [`WireError`] variants.

use crate::config::CodecConfig;
use crate::error::{WireError, WireResult};
use openfloor_types::Record;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use std::io::{Read, Write};
use tracing::debug;

/// Encoder/decoder for records, configured by a [`CodecConfig`].
#[derive(Debug, Clone, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    /// Create a codec. Fails if the config is unusable.
    pub fn new(config: CodecConfig) -> WireResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active settings.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode a record to JSON bytes.
    pub fn encode<R: Record>(&self, record: &R) -> WireResult<Vec<u8>> {
        let value = record.project()?;
        let bytes = self.encode_value(&value)?;
        debug!(record = R::NAME, bytes = bytes.len(), "Encoded record");
        Ok(bytes)
    }

    /// Encode a record to a JSON string.
    pub fn encode_to_string<R: Record>(&self, record: &R) -> WireResult<String> {
        let bytes = self.encode(record)?;
        // serde_json only ever emits UTF-8
        String::from_utf8(bytes).map_err(|e| {
            WireError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    fn encode_value(&self, value: &Value) -> WireResult<Vec<u8>> {
        if !self.config.pretty {
            return Ok(serde_json::to_vec(value)?);
        }
        let indent = vec![b' '; self.config.indent];
        let mut out = Vec::new();
        let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
        value.serialize(&mut ser)?;
        Ok(out)
    }

    /// Decode a record from JSON bytes.
    pub fn decode<R: Record>(&self, bytes: &[u8]) -> WireResult<R> {
        self.check_size(bytes.len() as u64)?;
        let value: Value = serde_json::from_slice(bytes)?;
        let record = R::reconstruct(value)?;
        debug!(record = R::NAME, bytes = bytes.len(), "Decoded record");
        Ok(record)
    }

    /// Decode a record from a JSON string.
    pub fn decode_str<R: Record>(&self, text: &str) -> WireResult<R> {
        self.decode(text.as_bytes())
    }

    /// Encode a record into a writer.
    pub fn write<R: Record, W: Write>(&self, record: &R, mut writer: W) -> WireResult<()> {
        let bytes = self.encode(record)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Decode a record from a reader, refusing documents over the size limit.
    pub fn read<R: Record, Rd: Read>(&self, reader: Rd) -> WireResult<R> {
        let limit = self.config.max_document_bytes as u64;
        let mut body = Vec::new();
        // One byte past the limit is enough to know it was exceeded.
        reader.take(limit + 1).read_to_end(&mut body)?;
        self.decode(&body)
    }

    pub(crate) fn check_size(&self, size: u64) -> WireResult<()> {
        let max = self.config.max_document_bytes as u64;
        if size > max {
            return Err(WireError::DocumentTooLarge { size, max });
        }
        Ok(())
    }
}

/// Encode a record to JSON text with default settings.
pub fn to_json<R: Record>(record: &R) -> WireResult<String> {
    Codec::default().encode_to_string(record)
}

/// Decode a record from JSON text with default settings.
pub fn from_json<R: Record>(text: &str) -> WireResult<R> {
    Codec::default().decode_str(text)
}
