use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::FieldValue;

/// Field name to value mapping for one generated row.
pub type RecordData = BTreeMap<String, FieldValue>;

/// One synthesized row together with its validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: RecordData,
    #[serde(default = "default_valid")]
    pub is_valid: bool,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default)]
    pub generation_metadata: BTreeMap<String, Value>,
}

fn default_valid() -> bool {
    true
}

impl Record {
    pub fn new(data: RecordData) -> Self {
        Self {
            data,
            is_valid: true,
            validation_errors: Vec::new(),
            generation_metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.generation_metadata.insert(key.into(), value.into());
        self
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.data.get(field)
    }

    /// Non-null value for `field`, if present.
    pub fn present_value(&self, field: &str) -> Option<&FieldValue> {
        self.data.get(field).filter(|value| !value.is_null())
    }

    /// Replace previous validation results.
    pub fn set_validation(&mut self, errors: Vec<String>) {
        self.is_valid = errors.is_empty();
        self.validation_errors = errors;
    }
}
