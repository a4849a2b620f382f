use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use synthgen_core::DataType;

/// Aggregate quality metrics over a batch of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_records: u64,
    /// Percentage of non-null cells across all records and schema fields.
    pub completeness: f64,
    /// Percentage of records that passed validation.
    pub validity: f64,
    pub field_statistics: BTreeMap<String, FieldStatistics>,
    /// Error counts keyed by the text before the first `:` of each message.
    pub validation_errors: BTreeMap<String, u64>,
}

impl QualityReport {
    pub fn empty() -> Self {
        Self {
            total_records: 0,
            completeness: 0.0,
            validity: 0.0,
            field_statistics: BTreeMap::new(),
            validation_errors: BTreeMap::new(),
        }
    }

    pub fn error_count(&self) -> u64 {
        self.validation_errors.values().sum()
    }
}

/// Per-field fill and cardinality counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    pub filled_count: u64,
    pub null_count: u64,
    pub unique_count: u64,
    pub data_type: DataType,
}

/// Quality metrics extended with per-column distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedQualityReport {
    #[serde(flatten)]
    pub summary: QualityReport,
    pub distribution_analysis: BTreeMap<String, ColumnDistribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnDistribution {
    Numeric {
        mean: f64,
        /// Sample standard deviation; absent with fewer than two values.
        #[serde(skip_serializing_if = "Option::is_none")]
        std: Option<f64>,
        min: f64,
        max: f64,
    },
    Categorical {
        unique_values: u64,
        most_common: Vec<ValueCount>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}
