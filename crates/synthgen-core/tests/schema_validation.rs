use std::fs;
use std::path::Path;

use synthgen_core::{DataType, load_schema, validate_schema_json};

fn load_json(name: &str) -> serde_json::Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../schemas/examples")
        .join(name);
    let contents =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing json at {}", path.display()));
    serde_json::from_str(&contents).expect("parse json")
}

#[test]
fn example_schemas_pass_structural_checks() {
    for name in ["users.schema.json", "orders.schema.json"] {
        let document = load_json(name);
        let report = validate_schema_json(&document).expect("validate schema json");
        assert!(report.is_valid(), "{name}: {:?}", report.errors);

        let loaded = load_schema(&document).expect("schema should load");
        assert!(loaded.warnings.is_empty(), "{name}: unexpected warnings");
    }
}

#[test]
fn users_schema_keeps_field_order_and_bounds() {
    let loaded = load_schema(&load_json("users.schema.json")).expect("load users");
    let schema = loaded.schema;
    assert_eq!(schema.record_count, 25);
    assert_eq!(
        schema.field_names(),
        vec!["name", "email", "age", "status", "signup_date", "score"]
    );
    let score = schema.field("score").expect("score");
    assert_eq!(score.data_type, DataType::Float);
    assert!(!score.required);
}

#[test]
fn duplicate_field_names_are_rejected() {
    let report = load_schema(&load_json("duplicate_fields.schema.json"))
        .expect_err("duplicate names must fail");
    assert!(!report.is_valid());
    assert!(
        report
            .error_messages()
            .contains(&"Duplicate field name: id".to_string())
    );
}
