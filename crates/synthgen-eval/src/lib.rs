//! Record validation and quality metrics for synthgen datasets.

pub mod engine;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod quality;
pub mod report;
pub mod validator;

pub use engine::{EvaluationEngine, load_records};
pub use errors::EvalError;
pub use metrics::{
    ColumnDistribution, DetailedQualityReport, FieldStatistics, QualityReport, ValueCount,
};
pub use model::{EvaluateOptions, EvaluationResult};
pub use quality::{
    completeness, detailed_quality_report, distribution_analysis, error_histogram, quality_report,
    uniqueness, validity,
};
pub use report::render_quality_report;
pub use validator::RecordValidator;
