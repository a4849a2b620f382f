use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::schema::{FieldSpec, Schema};
use crate::temporal::parse_iso;
use crate::types::{DataType, FieldValue};

/// Severity level for schema issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Structured schema issue with location and optional hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub code: String,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: IssueSeverity,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            path: path.into(),
            message: message.into(),
            hint,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of the pre-generation schema check.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchemaValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl SchemaValidationReport {
    /// Returns true when there are no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    pub fn push_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    pub fn merge(&mut self, other: SchemaValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|issue| issue.message.clone()).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings
            .iter()
            .map(|issue| issue.message.clone())
            .collect()
    }

    fn error(&mut self, code: &str, path: String, message: String) {
        self.push_error(ValidationIssue::new(
            IssueSeverity::Error,
            code,
            path,
            message,
            None,
        ));
    }

    fn warning(&mut self, code: &str, path: String, message: String, hint: Option<&str>) {
        self.push_warning(ValidationIssue::new(
            IssueSeverity::Warning,
            code,
            path,
            message,
            hint.map(str::to_string),
        ));
    }
}

impl Serialize for SchemaValidationReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("SchemaValidationReport", 3)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.end()
    }
}

/// Validate a schema before any data is generated.
///
/// This checks:
/// - the field list is non-empty and names are unique
/// - length and value bounds are ordered
/// - patterns compile and choices fit the declared type
pub fn validate_schema(schema: &Schema) -> SchemaValidationReport {
    let mut report = SchemaValidationReport::default();

    if schema.fields.is_empty() {
        report.error(
            "empty_schema",
            "/fields".to_string(),
            "Schema must have at least one field".to_string(),
        );
    }

    if schema.record_count == 0 {
        report.warning(
            "zero_record_count",
            "/record_count".to_string(),
            "record_count is 0; generation will produce no records".to_string(),
            None,
        );
    }

    let mut names = BTreeSet::new();
    for (index, field) in schema.fields.iter().enumerate() {
        let path = format!("/fields/{index}");
        if field.name.trim().is_empty() {
            report.error(
                "empty_field_name",
                format!("{path}/name"),
                format!("Field at position {index} has an empty name"),
            );
        }
        if !names.insert(field.name.as_str()) {
            report.error(
                "duplicate_field",
                format!("{path}/name"),
                format!("Duplicate field name: {}", field.name),
            );
        }

        validate_length_bounds(field, &path, &mut report);
        validate_value_bounds(field, &path, &mut report);
        validate_pattern(field, &path, &mut report);
        validate_choices(field, &path, &mut report);

        if field.data_type == DataType::Custom && field.custom_generator.is_none() {
            report.warning(
                "custom_without_generator",
                format!("{path}/custom_generator"),
                format!(
                    "Field '{}': custom type without custom_generator; a generator must be registered for the custom type",
                    field.name
                ),
                Some("register a generator before generating"),
            );
        }
    }

    report
}

fn validate_length_bounds(field: &FieldSpec, path: &str, report: &mut SchemaValidationReport) {
    if let (Some(min), Some(max)) = (field.min_length, field.max_length)
        && min > max
    {
        report.error(
            "inverted_length_bounds",
            format!("{path}/min_length"),
            format!(
                "Field '{}': min_length cannot be greater than max_length",
                field.name
            ),
        );
    }
}

fn validate_value_bounds(field: &FieldSpec, path: &str, report: &mut SchemaValidationReport) {
    for (key, bound) in [("min_value", &field.min_value), ("max_value", &field.max_value)] {
        let Some(bound) = bound else {
            continue;
        };
        if field.data_type.is_numeric() && !bound.is_numeric() {
            report.error(
                "non_numeric_bound",
                format!("{path}/{key}"),
                format!("Field '{}': {key} must be numeric, got {bound}", field.name),
            );
        } else if field.data_type.is_temporal() && bound.as_str().and_then(parse_iso).is_none() {
            report.error(
                "invalid_temporal_bound",
                format!("{path}/{key}"),
                format!(
                    "Field '{}': {key} must be an ISO-8601 date, got {bound}",
                    field.name
                ),
            );
        } else if !field.data_type.is_numeric() && !field.data_type.is_temporal() {
            report.warning(
                "bound_ignored",
                format!("{path}/{key}"),
                format!(
                    "Field '{}': {key} is ignored for data type {}",
                    field.name, field.data_type
                ),
                None,
            );
        }
    }

    let (Some(min), Some(max)) = (&field.min_value, &field.max_value) else {
        return;
    };
    match compare_bounds(min, max) {
        Some(true) => report.error(
            "inverted_value_bounds",
            format!("{path}/min_value"),
            format!(
                "Field '{}': min_value cannot be greater than max_value",
                field.name
            ),
        ),
        Some(false) => {}
        None if field.data_type.is_numeric() || field.data_type.is_temporal() => {}
        None => report.error(
            "incomparable_bounds",
            format!("{path}/min_value"),
            format!(
                "Field '{}': min_value and max_value are not comparable",
                field.name
            ),
        ),
    }
}

/// `Some(true)` when `min > max`; `None` when the pair cannot be ordered.
fn compare_bounds(min: &FieldValue, max: &FieldValue) -> Option<bool> {
    if let (Some(min), Some(max)) = (min.as_f64(), max.as_f64()) {
        return Some(min > max);
    }
    let min = min.as_str().and_then(parse_iso)?;
    let max = max.as_str().and_then(parse_iso)?;
    Some(min > max)
}

fn validate_pattern(field: &FieldSpec, path: &str, report: &mut SchemaValidationReport) {
    let Some(pattern) = &field.pattern else {
        return;
    };
    if let Err(err) = Regex::new(pattern) {
        report.error(
            "invalid_pattern",
            format!("{path}/pattern"),
            format!("Field '{}': invalid pattern: {err}", field.name),
        );
    } else if field.data_type != DataType::String {
        report.warning(
            "pattern_ignored",
            format!("{path}/pattern"),
            format!(
                "Field '{}': pattern only applies to string fields",
                field.name
            ),
            None,
        );
    }
}

fn validate_choices(field: &FieldSpec, path: &str, report: &mut SchemaValidationReport) {
    let Some(choices) = &field.choices else {
        return;
    };
    if choices.is_empty() {
        report.warning(
            "empty_choices",
            format!("{path}/choices"),
            format!("Field '{}': choices is empty and will be ignored", field.name),
            None,
        );
        return;
    }

    for choice in choices {
        let compatible = match field.data_type {
            DataType::Integer | DataType::Float => choice.is_numeric(),
            DataType::Boolean => choice.as_bool().is_some(),
            DataType::Date | DataType::Datetime => choice.as_str().and_then(parse_iso).is_some(),
            DataType::Custom => true,
            _ => choice.as_str().is_some(),
        };
        if !compatible {
            report.warning(
                "choice_type_mismatch",
                format!("{path}/choices"),
                format!(
                    "Field '{}': choice '{choice}' is not compatible with data type {}",
                    field.name, field.data_type
                ),
                None,
            );
        }
    }
}
