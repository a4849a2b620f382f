use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;
use synthgen_core::{DataType, FieldSpec, FieldValue, Record, RecordData, Schema};
use tracing::{info, warn};

use crate::errors::EvalError;
use crate::model::{EvaluateOptions, EvaluationResult};
use crate::quality::{detailed_quality_report, uniqueness};
use crate::report::render_quality_report;
use crate::validator::RecordValidator;

/// Re-validate an exported dataset and write its quality artifacts.
#[derive(Debug, Clone, Default)]
pub struct EvaluationEngine {
    options: EvaluateOptions,
}

impl EvaluationEngine {
    pub fn new(options: EvaluateOptions) -> Self {
        Self { options }
    }

    pub fn run(&self, schema: &Schema, dataset_path: &Path) -> Result<EvaluationResult, EvalError> {
        let mut warnings = Vec::new();
        let mut records = load_records(schema, dataset_path, self.options.strict, &mut warnings)?;

        let validator = RecordValidator::for_fields(&schema.fields);
        for record in &mut records {
            validator.validate(record, &schema.fields);
        }

        let quality = detailed_quality_report(&records, &schema.fields);
        let unique_fields: Vec<&str> = self.options.unique_fields.iter().map(String::as_str).collect();
        let uniqueness = uniqueness(&records, &unique_fields);
        let report = render_quality_report(&schema.name, &quality, &warnings);

        let out_dir = match &self.options.out_dir {
            Some(dir) => dir.clone(),
            None => dataset_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        fs::create_dir_all(&out_dir)?;

        let quality_path = out_dir.join("quality.json");
        fs::write(&quality_path, serde_json::to_vec_pretty(&quality)?)?;
        let report_path = out_dir.join("quality.md");
        fs::write(&report_path, report.as_bytes())?;

        let invalid = records.iter().filter(|record| !record.is_valid).count() as u64;
        info!(
            dataset = %dataset_path.display(),
            records = records.len(),
            invalid,
            completeness = quality.summary.completeness,
            validity = quality.summary.validity,
            "dataset evaluated"
        );

        if self.options.strict && invalid > 0 {
            return Err(EvalError::InvalidRecords(invalid));
        }

        Ok(EvaluationResult {
            quality_path,
            report_path,
            quality,
            uniqueness,
            report,
            warnings,
        })
    }
}

/// Load records from a `.csv`, `.jsonl` or `.json` export.
pub fn load_records(
    schema: &Schema,
    path: &Path,
    strict: bool,
    warnings: &mut Vec<String>,
) -> Result<Vec<Record>, EvalError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "csv" => load_csv(schema, path, strict, warnings),
        "jsonl" | "ndjson" => load_jsonl(path),
        "json" => load_json(path),
        other => Err(EvalError::UnsupportedFormat(if other.is_empty() {
            path.display().to_string()
        } else {
            other.to_string()
        })),
    }
}

fn load_csv(
    schema: &Schema,
    path: &Path,
    strict: bool,
    warnings: &mut Vec<String>,
) -> Result<Vec<Record>, EvalError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let positions: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let missing: Vec<&str> = schema
        .fields
        .iter()
        .map(|field| field.name.as_str())
        .filter(|name| !positions.contains_key(name))
        .collect();
    if !missing.is_empty() {
        let message = format!("missing columns: {}", missing.join(", "));
        warn!(dataset = %path.display(), "{message}");
        warnings.push(message);
    }

    let mut records = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = row?;
        let mut data = RecordData::new();
        for field in &schema.fields {
            let Some(position) = positions.get(field.name.as_str()) else {
                continue;
            };
            let raw = row.get(*position).unwrap_or_default();
            let value = match parse_cell(field, raw) {
                Ok(value) => value,
                Err(message) => {
                    if strict {
                        return Err(EvalError::InvalidDataset(format!(
                            "invalid value for '{}' at row {}",
                            field.name,
                            row_idx + 1
                        )));
                    }
                    warnings.push(format!("{} row {}: {message}", field.name, row_idx + 1));
                    FieldValue::Text(raw.to_string())
                }
            };
            data.insert(field.name.clone(), value);
        }
        records.push(Record::new(data));
    }
    Ok(records)
}

fn load_jsonl(path: &Path) -> Result<Vec<Record>, EvalError> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(record_from_json(&serde_json::from_str(&line)?)?);
    }
    Ok(records)
}

fn load_json(path: &Path) -> Result<Vec<Record>, EvalError> {
    let document: Value = serde_json::from_slice(&fs::read(path)?)?;
    let rows = match &document {
        Value::Array(rows) => rows,
        Value::Object(map) => map
            .get("records")
            .and_then(Value::as_array)
            .ok_or_else(|| EvalError::InvalidDataset("expected an array of records".to_string()))?,
        _ => {
            return Err(EvalError::InvalidDataset(
                "expected an array of records".to_string(),
            ));
        }
    };
    rows.iter().map(record_from_json).collect()
}

/// Accepts either a bare row object or a serialized `Record` with `data`.
fn record_from_json(value: &Value) -> Result<Record, EvalError> {
    let object = value
        .as_object()
        .ok_or_else(|| EvalError::InvalidDataset("record is not a JSON object".to_string()))?;
    let row = match object.get("data").and_then(Value::as_object) {
        Some(data) if object.contains_key("is_valid") => data,
        _ => object,
    };
    Ok(Record::new(
        row.iter()
            .map(|(name, value)| (name.clone(), FieldValue::from_json(value)))
            .collect(),
    ))
}

fn parse_cell(field: &FieldSpec, raw: &str) -> Result<FieldValue, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(FieldValue::Null);
    }
    match field.data_type {
        DataType::Integer => trimmed
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| format!("invalid integer '{trimmed}'")),
        DataType::Float => trimmed
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| format!("invalid float '{trimmed}'")),
        DataType::Boolean => parse_bool(trimmed)
            .map(FieldValue::Bool)
            .ok_or_else(|| format!("invalid boolean '{trimmed}'")),
        DataType::Custom => Ok(FieldValue::from_json(
            &serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())),
        )),
        _ => Ok(FieldValue::Text(raw.to_string())),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_cells_follow_declared_types() {
        let age = FieldSpec::new("age", DataType::Integer);
        assert_eq!(parse_cell(&age, "42"), Ok(FieldValue::Int(42)));
        assert_eq!(parse_cell(&age, ""), Ok(FieldValue::Null));
        assert!(parse_cell(&age, "4.2").is_err());

        let flag = FieldSpec::new("flag", DataType::Boolean);
        assert_eq!(parse_cell(&flag, "True"), Ok(FieldValue::Bool(true)));

        let custom = FieldSpec::new("payload", DataType::Custom);
        assert_eq!(parse_cell(&custom, "7"), Ok(FieldValue::Int(7)));
        assert_eq!(parse_cell(&custom, "abc"), Ok(FieldValue::from("abc")));
    }

    #[test]
    fn json_rows_accept_bare_and_wrapped_records() {
        let bare = record_from_json(&serde_json::json!({"age": 3})).expect("bare");
        assert_eq!(bare.value("age"), Some(&FieldValue::Int(3)));

        let wrapped = record_from_json(&serde_json::json!({
            "data": {"age": 4},
            "is_valid": true,
            "validation_errors": []
        }))
        .expect("wrapped");
        assert_eq!(wrapped.value("age"), Some(&FieldValue::Int(4)));
    }
}
