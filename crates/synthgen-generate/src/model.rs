use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use synthgen_core::{Record, Schema};
use synthgen_eval::QualityReport;

use crate::errors::GenerationError;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_EMERGENCY_CEILING: u64 = 1000;
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 80.0;
pub const DEFAULT_ADAPTIVE_WINDOW: usize = 10;
pub const DEFAULT_LOCALE: &str = "en_US";

/// Execution strategy for the generation pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One record per generate/validate cycle.
    #[default]
    Sequential,
    /// Up to `batch_size` records per cycle, validated together.
    Batched,
    /// Sequential with a quality check over a sliding window.
    Adaptive,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Batched => "batched",
            Strategy::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = GenerationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Strategy::Sequential),
            "batched" | "batch" => Ok(Strategy::Batched),
            "adaptive" => Ok(Strategy::Adaptive),
            other => Err(GenerationError::Config(format!("unknown strategy '{other}'"))),
        }
    }
}

/// Per-call generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Overrides the schema's `record_count`.
    pub record_count: Option<u64>,
    /// Hard cap on state transitions; derived from the target when unset.
    pub recursion_limit: Option<u64>,
    pub use_contextual_generation: bool,
    /// Seed for reproducible runs; a random seed is drawn when unset.
    pub seed: Option<u64>,
    pub locale: String,
    pub batch_size: usize,
    pub emergency_ceiling: u64,
    /// Window validity percentage below which the adaptive strategy flags a quality issue.
    pub quality_threshold: f64,
    pub adaptive_window: usize,
    /// Free-form values made visible to generators.
    pub context: BTreeMap<String, Value>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            record_count: None,
            recursion_limit: None,
            use_contextual_generation: false,
            seed: None,
            locale: DEFAULT_LOCALE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            emergency_ceiling: DEFAULT_EMERGENCY_CEILING,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            adaptive_window: DEFAULT_ADAPTIVE_WINDOW,
            context: BTreeMap::new(),
        }
    }
}

impl GenerationParams {
    pub fn with_record_count(mut self, record_count: u64) -> Self {
        self.record_count = Some(record_count);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_recursion_limit(mut self, limit: u64) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    pub fn contextual(mut self, enabled: bool) -> Self {
        self.use_contextual_generation = enabled;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// Profile used to bias a slice of the generated records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl Persona {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// One adaptive-strategy quality flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adaptation {
    pub after_records: u64,
    pub window_validity: f64,
}

/// Typed context threaded through one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationContext {
    pub params: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    pub quality_issue: bool,
    pub retry_count: u32,
    pub adaptations: Vec<Adaptation>,
}

/// Run-level metadata attached to a successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub run_id: String,
    pub schema_name: String,
    pub record_count: u64,
    pub requested_records: u64,
    pub strategy: Strategy,
    /// RFC-3339 completion time.
    pub timestamp: String,
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_fingerprint: Option<String>,
    pub seed: u64,
    pub contextual: bool,
    pub adaptations: u64,
    pub contextual_records: u64,
    pub fallback_records: u64,
    pub transitions: u64,
    pub duration_ms: u64,
    /// Record counts per persona, for persona runs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub personas: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDataset {
    pub schema: Schema,
    /// Column order, following the schema's field order.
    pub columns: Vec<String>,
    pub records: Vec<Record>,
    pub quality_metrics: QualityReport,
    pub validation_errors: Vec<String>,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Schema,
    Config,
    Runtime,
    BudgetExceeded,
}

impl FailureKind {
    pub fn of(err: &GenerationError) -> Self {
        match err {
            GenerationError::InvalidSchema(_) => FailureKind::Schema,
            GenerationError::Config(_) => FailureKind::Config,
            GenerationError::BudgetExceeded { .. } => FailureKind::BudgetExceeded,
            _ => FailureKind::Runtime,
        }
    }
}

/// Whole-run failure; never carries partial records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub error: String,
    pub kind: FailureKind,
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub quality_metrics: BTreeMap<String, Value>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
}

impl GenerationFailure {
    pub fn from_error(err: &GenerationError) -> Self {
        let validation_errors = match err {
            GenerationError::InvalidSchema(errors) => errors.clone(),
            other => vec![other.to_string()],
        };
        Self {
            error: err.to_string(),
            kind: FailureKind::of(err),
            records: Vec::new(),
            quality_metrics: BTreeMap::new(),
            validation_errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success(GeneratedDataset),
    Failure(GenerationFailure),
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    pub fn dataset(&self) -> Option<&GeneratedDataset> {
        match self {
            GenerationResult::Success(dataset) => Some(dataset),
            GenerationResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&GenerationFailure> {
        match self {
            GenerationResult::Success(_) => None,
            GenerationResult::Failure(failure) => Some(failure),
        }
    }

    /// Records of a successful run; empty for a failure.
    pub fn records(&self) -> &[Record] {
        match self {
            GenerationResult::Success(dataset) => &dataset.records,
            GenerationResult::Failure(failure) => &failure.records,
        }
    }

    /// Borrow the dataset or report the failure as an error.
    pub fn require_dataset(&self) -> Result<&GeneratedDataset, GenerationError> {
        match self {
            GenerationResult::Success(dataset) => Ok(dataset),
            GenerationResult::Failure(failure) => {
                Err(GenerationError::GenerationFailed(failure.error.clone()))
            }
        }
    }

    pub fn into_dataset(self) -> Result<GeneratedDataset, GenerationError> {
        match self {
            GenerationResult::Success(dataset) => Ok(dataset),
            GenerationResult::Failure(failure) => {
                Err(GenerationError::GenerationFailed(failure.error))
            }
        }
    }
}

/// Summary of how a run was produced, for contextual runs in particular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationInsights {
    pub total_records: u64,
    pub contextual_records: u64,
    pub fallback_records: u64,
    /// Percentage of records produced by the record generator.
    pub contextual_rate: f64,
    pub adaptations: u64,
    pub quality_issue_records: u64,
    pub validity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_and_displays() {
        assert_eq!("Batched".parse::<Strategy>().expect("parse"), Strategy::Batched);
        assert_eq!(Strategy::Adaptive.to_string(), "adaptive");
        assert!("parallel".parse::<Strategy>().is_err());
    }

    #[test]
    fn params_fill_defaults_from_partial_json() {
        let params: GenerationParams =
            serde_json::from_str(r#"{"record_count": 5, "seed": 9}"#).expect("parse params");
        assert_eq!(params.record_count, Some(5));
        assert_eq!(params.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(params.emergency_ceiling, DEFAULT_EMERGENCY_CEILING);
        assert_eq!(params.locale, DEFAULT_LOCALE);
    }

    #[test]
    fn failure_serializes_with_status_tag() {
        let result = GenerationResult::Failure(GenerationFailure::from_error(
            &GenerationError::InvalidSchema(vec!["Duplicate field name: id".to_string()]),
        ));
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["status"], "failure");
        assert_eq!(json["kind"], "schema");
        assert_eq!(json["records"], serde_json::json!([]));
        assert_eq!(json["validation_errors"][0], "Duplicate field name: id");
    }
}
