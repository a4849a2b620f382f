use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::types::{DataType, FieldValue};

/// Record count used when a schema document omits one.
pub const DEFAULT_RECORD_COUNT: u64 = 100;

/// Contract for a single column of a generated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    /// Column name, unique within the schema.
    pub name: String,
    /// Declared type (case-insensitive identifier).
    #[serde(alias = "type")]
    #[schemars(with = "String")]
    pub data_type: DataType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Lower bound: a number for numeric fields, an ISO-8601 string for dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<FieldValue>,
    /// Upper bound: a number for numeric fields, an ISO-8601 string for dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<FieldValue>,
    /// Regular expression applied to string values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Closed value set; generation and validation are restricted to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<FieldValue>>,
    /// Substituted when a generator yields nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of a caller-registered generator for `custom` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_generator: Option<String>,
    /// Free-form dependency hints, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Value>,
}

fn default_required() -> bool {
    true
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: true,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            pattern: None,
            choices: None,
            default_value: None,
            description: None,
            custom_generator: None,
            dependencies: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_range(mut self, min: impl Into<FieldValue>, max: impl Into<FieldValue>) -> Self {
        self.min_value = Some(min.into()).filter(|value| !value.is_null());
        self.max_value = Some(max.into()).filter(|value| !value.is_null());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_choices<T: Into<FieldValue>>(mut self, choices: impl IntoIterator<Item = T>) -> Self {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_custom_generator(mut self, name: impl Into<String>) -> Self {
        self.custom_generator = Some(name.into());
        self
    }

    /// Non-empty closed value set, if any.
    pub fn choice_set(&self) -> Option<&[FieldValue]> {
        self.choices
            .as_deref()
            .filter(|choices| !choices.is_empty())
    }
}

/// Declarative description of a dataset to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Schema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered field definitions.
    pub fields: Vec<FieldSpec>,
    /// Cross-field or cross-table relationship metadata (pass-through).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Value>,
    /// Free-form dataset constraints (pass-through).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Value>,
    /// Target number of records.
    #[serde(default = "default_record_count")]
    pub record_count: u64,
}

fn default_record_count() -> u64 {
    DEFAULT_RECORD_COUNT
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields,
            relationships: None,
            constraints: None,
            record_count: DEFAULT_RECORD_COUNT,
        }
    }

    pub fn with_record_count(mut self, record_count: u64) -> Self {
        self.record_count = record_count;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_relationships(mut self, relationships: Value) -> Self {
        self.relationships = Some(relationships);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// SHA-256 over the canonical JSON form, used to tie runs to their schema.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
