//! # Accumulator
//!
//! The run-scoped bag of results produced by completed steps.
//!
//! Keys are step-result names and values are arbitrary JSON. The orchestrator
//! only ever appends or sets keys; it never removes one. Keys it does not
//! recognise are carried along untouched.

use crate::constants::accumulator_keys;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accumulator(BTreeMap<String, Value>);

/// `photo_ids` holds something other than a list
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("accumulated key '{key}' should be a list but holds {found}")]
pub struct MalformedAccumulator {
    pub key: &'static str,
    pub found: String,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Uploaded image identifiers in upload order
    pub fn photo_ids(&self) -> Result<&[Value], MalformedAccumulator> {
        match self.0.get(accumulator_keys::PHOTO_IDS) {
            None => Ok(&[]),
            Some(Value::Array(ids)) => Ok(ids.as_slice()),
            Some(other) => Err(MalformedAccumulator {
                key: accumulator_keys::PHOTO_IDS,
                found: other.to_string(),
            }),
        }
    }

    /// Append one uploaded image identifier
    pub fn append_photo_id(&mut self, photo_id: Value) -> Result<(), MalformedAccumulator> {
        let entry = self
            .0
            .entry(accumulator_keys::PHOTO_IDS.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        match entry {
            Value::Array(ids) => {
                ids.push(photo_id);
                Ok(())
            }
            other => Err(MalformedAccumulator {
                key: accumulator_keys::PHOTO_IDS,
                found: other.to_string(),
            }),
        }
    }

    /// Set `key` unless it already holds a value. Returns whether it was written.
    pub fn set_once(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.0.contains_key(&key) {
            return false;
        }
        self.0.insert(key, value);
        true
    }

    pub fn listing_created(&self) -> bool {
        matches!(
            self.0.get(accumulator_keys::LISTING_CREATED),
            Some(Value::Bool(true))
        )
    }

    pub fn mark_listing_created(&mut self) {
        self.0.insert(
            accumulator_keys::LISTING_CREATED.to_string(),
            Value::Bool(true),
        );
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for Accumulator {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
