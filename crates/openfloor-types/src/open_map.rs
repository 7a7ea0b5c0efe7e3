//! Open, ordered key-value bags: event `parameters` and conversant
//! `persistentState`.
//!
//! These have no fixed schema. They project to their literal content in
//! insertion order, and reconstruct from any JSON object.

use crate::error::{OpenFloorResult, ValidationError};
use crate::record::{record_serde, to_value, Record};
use serde_json::{Map, Value};

macro_rules! open_map {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name(Map<String, Value>);

        impl $name {
            /// Create an empty map.
            pub fn new() -> Self {
                Self(Map::new())
            }

            /// Look up a value by key.
            pub fn get(&self, key: &str) -> Option<&Value> {
                self.0.get(key)
            }

            /// Insert a value, returning the previous one for that key.
            pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
                self.0.insert(key.into(), value)
            }

            /// Insert any serializable value.
            pub fn insert_serialized<T: serde::Serialize>(
                &mut self,
                key: impl Into<String>,
                value: &T,
            ) -> OpenFloorResult<()> {
                self.0.insert(key.into(), to_value(value)?);
                Ok(())
            }

            /// Insert a record's projection.
            pub fn insert_record<R: Record>(
                &mut self,
                key: impl Into<String>,
                record: &R,
            ) -> OpenFloorResult<()> {
                self.0.insert(key.into(), record.project()?);
                Ok(())
            }

            /// Reconstruct the record stored under `key`, if any.
            pub fn get_record<R: Record>(&self, key: &str) -> Option<OpenFloorResult<R>> {
                self.0.get(key).cloned().map(R::reconstruct)
            }

            /// Remove a key. Remaining entries keep their order.
            pub fn remove(&mut self, key: &str) -> Option<Value> {
                self.0.shift_remove(key)
            }

            /// Whether the key is present.
            pub fn contains_key(&self, key: &str) -> bool {
                self.0.contains_key(key)
            }

            /// Number of entries.
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// Whether the map has no entries.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Iterate entries in insertion order.
            pub fn iter(&self) -> serde_json::map::Iter<'_> {
                self.0.iter()
            }

            /// Borrow the underlying map.
            pub fn as_map(&self) -> &Map<String, Value> {
                &self.0
            }

            /// Unwrap into the underlying map.
            pub fn into_inner(self) -> Map<String, Value> {
                self.0
            }
        }

        impl From<Map<String, Value>> for $name {
            fn from(map: Map<String, Value>) -> Self {
                Self(map)
            }
        }

        impl<K: Into<String>> FromIterator<(K, Value)> for $name {
            fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
                Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = (&'a String, &'a Value);
            type IntoIter = serde_json::map::Iter<'a>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }

        impl Record for $name {
            const NAME: &'static str = stringify!($name);

            fn project(&self) -> OpenFloorResult<Value> {
                Ok(Value::Object(self.0.clone()))
            }

            fn reconstruct(value: Value) -> OpenFloorResult<Self> {
                match value {
                    Value::Object(map) => Ok(Self(map)),
                    _ => Err(ValidationError::WrongShape {
                        record: Self::NAME,
                        field: "<root>".to_string(),
                        reason: "expected an object".to_string(),
                    }
                    .into()),
                }
            }
        }

        record_serde!($name);
    };
}

open_map!(
    Parameters,
    "Event-type-specific payload. No fixed schema; keys are unique and keep insertion order."
);
open_map!(
    PersistentState,
    "Opaque per-conversant state carried across envelopes."
);
