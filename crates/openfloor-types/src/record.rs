//! The projection/reconstruction contract every wire record implements.
//!
//! A record projects itself into an ordered JSON value (declaration order,
//! with its omission rules applied explicitly) and rebuilds itself from an
//! untyped JSON value, reconstructing nested records before its own
//! validator runs. [`Projection`] and [`Fields`] are the two halves of that
//! contract; every record in this crate is written against them.
//!
//! Records also implement `serde::Serialize` and `serde::Deserialize` by
//! delegating to the contract, so any serde encoder can handle them without
//! knowing their concrete types.

use crate::error::{OpenFloorError, OpenFloorResult, ValidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// A typed wire record.
pub trait Record: Sized {
    /// Record name used in error messages.
    const NAME: &'static str;

    /// Project this record into its canonical JSON value.
    fn project(&self) -> OpenFloorResult<Value>;

    /// Rebuild and validate a record from an untyped JSON value.
    fn reconstruct(value: Value) -> OpenFloorResult<Self>;
}

/// Convert a leaf value into JSON, naming its type if that is impossible.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> OpenFloorResult<Value> {
    serde_json::to_value(value).map_err(|e| OpenFloorError::Unsupported {
        type_name: std::any::type_name::<T>(),
        reason: e.to_string(),
    })
}

/// Project a slice of records into a JSON array.
pub fn project_list<R: Record>(records: &[R]) -> OpenFloorResult<Value> {
    records
        .iter()
        .map(Record::project)
        .collect::<OpenFloorResult<Vec<_>>>()
        .map(Value::Array)
}

/// Reconstruct a JSON array into records, failing on the first bad element.
pub fn reconstruct_list<R: Record>(
    record: &'static str,
    field: &str,
    value: Value,
) -> OpenFloorResult<Vec<R>> {
    match value {
        Value::Array(items) => items.into_iter().map(R::reconstruct).collect(),
        other => Err(wrong_shape(record, field, "an array", &other)),
    }
}

fn wrong_shape(record: &'static str, field: &str, expected: &str, got: &Value) -> OpenFloorError {
    ValidationError::WrongShape {
        record,
        field: field.to_string(),
        reason: format!("expected {expected}, got {}", json_kind(got)),
    }
    .into()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Ordered projection builder.
///
/// Keys come out in the order they are added; the `optional*` and
/// `non_empty*` methods encode the omission rules.
#[derive(Debug, Default)]
pub struct Projection {
    fields: Map<String, Value>,
}

impl Projection {
    /// Create an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always emit `name`.
    pub fn field<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> OpenFloorResult<()> {
        self.fields.insert(name.to_string(), to_value(value)?);
        Ok(())
    }

    /// Emit `name` only when the value is present.
    pub fn optional<T: Serialize>(&mut self, name: &str, value: Option<&T>) -> OpenFloorResult<()> {
        match value {
            Some(v) => self.field(name, v),
            None => Ok(()),
        }
    }

    /// Emit `name` only when the list is non-empty.
    pub fn non_empty<T: Serialize>(&mut self, name: &str, values: &[T]) -> OpenFloorResult<()> {
        if values.is_empty() {
            return Ok(());
        }
        self.field(name, values)
    }

    /// Emit an already-projected value.
    pub fn value(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// Always emit a nested record.
    pub fn record<R: Record>(&mut self, name: &str, record: &R) -> OpenFloorResult<()> {
        self.value(name, record.project()?);
        Ok(())
    }

    /// Emit a nested record only when present.
    pub fn optional_record<R: Record>(&mut self, name: &str, record: Option<&R>) -> OpenFloorResult<()> {
        match record {
            Some(r) => self.record(name, r),
            None => Ok(()),
        }
    }

    /// Always emit a list of records.
    pub fn records<R: Record>(&mut self, name: &str, records: &[R]) -> OpenFloorResult<()> {
        self.value(name, project_list(records)?);
        Ok(())
    }

    /// Emit a list of records only when non-empty.
    pub fn non_empty_records<R: Record>(&mut self, name: &str, records: &[R]) -> OpenFloorResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.records(name, records)
    }

    /// Finish into a JSON object.
    pub fn finish(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Field extractor used by [`Record::reconstruct`].
///
/// Each accessor removes its key, so [`Fields::finish`] can reject anything
/// the record does not declare. A JSON `null` is treated the same as an
/// absent key.
#[derive(Debug)]
pub struct Fields {
    record: &'static str,
    map: Map<String, Value>,
}

impl Fields {
    /// Open a JSON value as the fields of `record`. Fails unless it is an object.
    pub fn new(record: &'static str, value: Value) -> OpenFloorResult<Self> {
        match value {
            Value::Object(map) => Ok(Self { record, map }),
            other => Err(wrong_shape(record, "<root>", "an object", &other)),
        }
    }

    fn take(&mut self, name: &str) -> Option<Value> {
        match self.map.remove(name) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    fn missing(&self, field: &'static str) -> OpenFloorError {
        ValidationError::MissingField {
            record: self.record,
            field,
        }
        .into()
    }

    fn decode<T: DeserializeOwned>(&self, name: &str, value: Value) -> OpenFloorResult<T> {
        serde_json::from_value(value).map_err(|e| {
            ValidationError::WrongShape {
                record: self.record,
                field: name.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// A required leaf value.
    pub fn required<T: DeserializeOwned>(&mut self, name: &'static str) -> OpenFloorResult<T> {
        let value = self.take(name).ok_or_else(|| self.missing(name))?;
        self.decode(name, value)
    }

    /// An optional leaf value.
    pub fn optional<T: DeserializeOwned>(&mut self, name: &str) -> OpenFloorResult<Option<T>> {
        match self.take(name) {
            Some(value) => self.decode(name, value).map(Some),
            None => Ok(None),
        }
    }

    /// An optional raw JSON value, kept verbatim.
    pub fn raw(&mut self, name: &str) -> Option<Value> {
        self.take(name)
    }

    /// A required nested record.
    pub fn required_record<R: Record>(&mut self, name: &'static str) -> OpenFloorResult<R> {
        let value = self.take(name).ok_or_else(|| self.missing(name))?;
        R::reconstruct(value)
    }

    /// An optional nested record.
    pub fn optional_record<R: Record>(&mut self, name: &str) -> OpenFloorResult<Option<R>> {
        self.take(name).map(R::reconstruct).transpose()
    }

    /// A list of records; absent means empty.
    pub fn records<R: Record>(&mut self, name: &str) -> OpenFloorResult<Vec<R>> {
        match self.take(name) {
            Some(value) => reconstruct_list(self.record, name, value),
            None => Ok(Vec::new()),
        }
    }

    /// A list of record lists; absent means empty.
    pub fn record_lists<R: Record>(&mut self, name: &str) -> OpenFloorResult<Vec<Vec<R>>> {
        match self.take(name) {
            Some(Value::Array(lists)) => lists
                .into_iter()
                .map(|list| reconstruct_list(self.record, name, list))
                .collect(),
            Some(other) => Err(wrong_shape(self.record, name, "an array", &other)),
            None => Ok(Vec::new()),
        }
    }

    /// A JSON object kept as an ordered map; absent means empty.
    pub fn object(&mut self, name: &str) -> OpenFloorResult<Map<String, Value>> {
        match self.take(name) {
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(wrong_shape(self.record, name, "an object", &other)),
            None => Ok(Map::new()),
        }
    }

    /// Reject any key no accessor consumed.
    pub fn finish(self) -> OpenFloorResult<()> {
        match self.map.into_iter().next() {
            Some((field, _)) => Err(ValidationError::UnknownField {
                record: self.record,
                field,
            }
            .into()),
            None => Ok(()),
        }
    }
}

/// Implement serde's traits for records by delegating to [`Record`].
macro_rules! record_serde {
    ($($ty:ty),+ $(,)?) => {$(
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let value = $crate::record::Record::project(self).map_err(serde::ser::Error::custom)?;
                serde::Serialize::serialize(&value, serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                <$ty as $crate::record::Record>::reconstruct(value).map_err(serde::de::Error::custom)
            }
        }
    )+};
}

pub(crate) use record_serde;
