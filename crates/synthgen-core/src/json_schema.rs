use jsonschema::JSONSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::validation::{IssueSeverity, SchemaValidationReport, ValidationIssue, validate_schema};

/// Emit the JSON Schema for schema documents.
pub fn schema_json_schema() -> RootSchema {
    schema_for!(Schema)
}

/// Schema document that passed structural and semantic checks.
#[derive(Debug, Clone)]
pub struct LoadedSchema {
    pub schema: Schema,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a schema document against the generated JSON Schema.
pub fn validate_schema_json(document: &Value) -> Result<SchemaValidationReport> {
    let json_schema = serde_json::to_value(schema_json_schema())?;
    let compiled =
        JSONSchema::compile(&json_schema).map_err(|err| Error::InvalidSchema(err.to_string()))?;

    let document = normalize_field_keys(document);
    let mut report = SchemaValidationReport::default();
    if let Err(errors) = compiled.validate(&document) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }
    Ok(report)
}

/// Parse and validate a schema document end-to-end.
///
/// Structural issues short-circuit before typed parsing; semantic checks run
/// on the parsed schema and their warnings are carried on success.
pub fn load_schema(document: &Value) -> std::result::Result<LoadedSchema, SchemaValidationReport> {
    let structural = match validate_schema_json(document) {
        Ok(report) => report,
        Err(err) => {
            let mut report = SchemaValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_validation_error",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };
    if !structural.is_valid() {
        return Err(structural);
    }

    let schema: Schema = match serde_json::from_value(document.clone()) {
        Ok(schema) => schema,
        Err(err) => {
            let mut report = SchemaValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_document",
                "/",
                err.to_string(),
                Some("check field types against the supported data types".to_string()),
            ));
            return Err(report);
        }
    };

    let semantic = validate_schema(&schema);
    if !semantic.is_valid() {
        return Err(semantic);
    }
    Ok(LoadedSchema {
        schema,
        warnings: semantic.warnings,
    })
}

/// Field specs accept `type` as an alias for `data_type`; the JSON Schema only
/// knows the canonical key.
fn normalize_field_keys(document: &Value) -> Value {
    let mut document = document.clone();
    if let Some(fields) = document.get_mut("fields").and_then(Value::as_array_mut) {
        for field in fields.iter_mut().filter_map(Value::as_object_mut) {
            if !field.contains_key("data_type")
                && let Some(value) = field.remove("type")
            {
                field.insert("data_type".to_string(), value);
            }
        }
    }
    document
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_type_alias_documents() {
        let document = json!({
            "name": "users",
            "fields": [{"name": "email", "type": "email"}]
        });
        let report = validate_schema_json(&document).expect("validate");
        assert!(report.is_valid(), "{:?}", report.errors);
    }

    #[test]
    fn reports_missing_fields_key() {
        let report = validate_schema_json(&json!({"name": "users"})).expect("validate");
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].code, "schema_violation");
    }

    #[test]
    fn load_rejects_unknown_data_type() {
        let document = json!({
            "name": "users",
            "fields": [{"name": "id", "data_type": "uuid"}]
        });
        let report = load_schema(&document).expect_err("unknown type");
        assert_eq!(report.errors[0].code, "invalid_document");
    }
}
