use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use synthgen_core::temporal::parse_iso;
use synthgen_core::{DataType, FieldSpec, FieldValue, Record};

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

/// Checks records against field-level constraints.
///
/// Validation never fails: malformed values, including patterns that do not
/// compile, are reported as `"<field>: <rule>"` strings on the record.
#[derive(Debug, Default, Clone)]
pub struct RecordValidator {
    patterns: BTreeMap<String, Result<Regex, String>>,
}

impl RecordValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-compile the patterns used by `fields`.
    pub fn for_fields(fields: &[FieldSpec]) -> Self {
        let mut validator = Self::new();
        for pattern in fields.iter().filter_map(|field| field.pattern.as_ref()) {
            validator
                .patterns
                .entry(pattern.clone())
                .or_insert_with(|| compile(pattern));
        }
        validator
    }

    /// Validate `record` in place, replacing any previous verdict.
    pub fn validate(&self, record: &mut Record, fields: &[FieldSpec]) {
        let errors = self.check(record, fields);
        record.set_validation(errors);
    }

    /// Validation errors for `record` without mutating it.
    pub fn check(&self, record: &Record, fields: &[FieldSpec]) -> Vec<String> {
        let mut errors = Vec::new();
        for field in fields {
            let value = match record.present_value(&field.name) {
                Some(value) => value,
                None => {
                    if field.required {
                        errors.push(format!("{}: required field missing", field.name));
                    }
                    continue;
                }
            };

            if let Some(message) = type_error(field, value) {
                errors.push(format!("{}: {message}", field.name));
                continue;
            }
            self.check_constraints(field, value, &mut errors);
        }
        errors
    }

    /// Cross-record checks driven by relationship metadata.
    ///
    /// Only `{"fields": [...]}` or `[{"field": ...}]` shapes are understood;
    /// each named field must be non-null. Anything else yields no errors.
    pub fn validate_relationships(&self, record: &Record, relationships: Option<&Value>) -> Vec<String> {
        let Some(relationships) = relationships else {
            return Vec::new();
        };
        relationship_fields(relationships)
            .into_iter()
            .filter(|name| record.present_value(name).is_none())
            .map(|name| format!("{name}: relationship field is null"))
            .collect()
    }

    fn check_constraints(&self, field: &FieldSpec, value: &FieldValue, errors: &mut Vec<String>) {
        let name = &field.name;

        if let FieldValue::Text(text) = value {
            let length = text.chars().count();
            if let Some(min) = field.min_length
                && length < min
            {
                errors.push(format!("{name}: length {length} is below min_length {min}"));
            }
            if let Some(max) = field.max_length
                && length > max
            {
                errors.push(format!("{name}: length {length} exceeds max_length {max}"));
            }
        }

        if field.data_type.is_numeric() {
            check_numeric_bounds(field, value, errors);
        } else if field.data_type.is_temporal() {
            check_temporal_bounds(field, value, errors);
        }

        if let (Some(pattern), FieldValue::Text(text)) = (&field.pattern, value) {
            match self.regex_for(pattern) {
                Ok(regex) => {
                    if !regex.is_match(text) {
                        errors.push(format!("{name}: value does not match pattern '{pattern}'"));
                    }
                }
                Err(err) => errors.push(format!("{name}: invalid pattern '{pattern}': {err}")),
            }
        }

        if let Some(choices) = field.choice_set()
            && !choices.iter().any(|choice| choice.loosely_equals(value))
        {
            errors.push(format!("{name}: value '{value}' is not one of the allowed choices"));
        }
    }

    fn regex_for(&self, pattern: &str) -> Result<Regex, String> {
        match self.patterns.get(pattern) {
            Some(compiled) => compiled.clone(),
            None => compile(pattern),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, String> {
    Regex::new(pattern).map_err(|err| err.to_string())
}

fn type_error(field: &FieldSpec, value: &FieldValue) -> Option<String> {
    let matches = match field.data_type {
        DataType::Integer => matches!(value, FieldValue::Int(_)),
        DataType::Float => value.is_numeric(),
        DataType::Boolean => matches!(value, FieldValue::Bool(_)),
        DataType::String | DataType::Phone | DataType::Address | DataType::Name => {
            matches!(value, FieldValue::Text(_))
        }
        DataType::Date | DataType::Datetime => {
            return match value.as_str() {
                Some(text) if parse_iso(text).is_some() => None,
                Some(text) => Some(format!("invalid {} format '{text}'", field.data_type)),
                None => Some(format!(
                    "expected {} string, got {}",
                    field.data_type,
                    value.type_name()
                )),
            };
        }
        DataType::Email => {
            return match value.as_str() {
                Some(text) if is_email(text) => None,
                Some(_) => Some("invalid email format".to_string()),
                None => Some(format!("expected email string, got {}", value.type_name())),
            };
        }
        DataType::Custom => true,
    };
    if matches {
        None
    } else {
        Some(format!(
            "expected {}, got {}",
            field.data_type,
            value.type_name()
        ))
    }
}

fn is_email(text: &str) -> bool {
    match email_regex() {
        Some(regex) => regex.is_match(text),
        None => text.contains('@'),
    }
}

fn check_numeric_bounds(field: &FieldSpec, value: &FieldValue, errors: &mut Vec<String>) {
    let Some(number) = value.as_f64() else {
        return;
    };
    if let Some(min) = field.min_value.as_ref().and_then(FieldValue::as_f64)
        && number < min
    {
        errors.push(format!("{}: value {value} is below min_value {min}", field.name));
    }
    if let Some(max) = field.max_value.as_ref().and_then(FieldValue::as_f64)
        && number > max
    {
        errors.push(format!("{}: value {value} exceeds max_value {max}", field.name));
    }
}

fn check_temporal_bounds(field: &FieldSpec, value: &FieldValue, errors: &mut Vec<String>) {
    let Some(moment) = value.as_str().and_then(parse_iso) else {
        return;
    };
    let bound = |bound: &Option<FieldValue>| bound.as_ref().and_then(|b| b.as_str().and_then(parse_iso));
    if let Some(min) = bound(&field.min_value)
        && moment < min
    {
        errors.push(format!("{}: {value} is before min_value {}", field.name, display(&field.min_value)));
    }
    if let Some(max) = bound(&field.max_value)
        && moment > max
    {
        errors.push(format!("{}: {value} is after max_value {}", field.name, display(&field.max_value)));
    }
}

fn display(value: &Option<FieldValue>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn relationship_fields(relationships: &Value) -> Vec<String> {
    let names = |items: &Vec<Value>| -> Vec<String> {
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name.clone()),
                Value::Object(map) => map.get("field").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect()
    };
    match relationships {
        Value::Array(items) => names(items),
        Value::Object(map) => map
            .get("fields")
            .and_then(Value::as_array)
            .map(names)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
