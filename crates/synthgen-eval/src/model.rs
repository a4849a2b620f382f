use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::metrics::DetailedQualityReport;

/// Options for evaluating an exported dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluateOptions {
    /// Fail when any record is invalid or a cell cannot be parsed.
    pub strict: bool,
    /// Fields whose uniqueness percentage should be reported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_fields: Vec<String>,
    /// Optional output directory override; defaults to the dataset's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
}

/// Result of a dataset evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub quality_path: PathBuf,
    pub report_path: PathBuf,
    pub quality: DetailedQualityReport,
    pub uniqueness: BTreeMap<String, f64>,
    pub report: String,
    pub warnings: Vec<String>,
}
