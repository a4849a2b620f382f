use std::fs;
use std::path::PathBuf;

use synthgen_core::{DataType, FieldSpec, Schema};
use synthgen_eval::{EvalError, EvaluateOptions, EvaluationEngine};
use uuid::Uuid;

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("synthgen_eval_{label}_{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn people_schema() -> Schema {
    Schema::new(
        "people",
        vec![
            FieldSpec::new("name", DataType::Name),
            FieldSpec::new("age", DataType::Integer).with_range(18, 80),
            FieldSpec::new("active", DataType::Boolean).required(false),
        ],
    )
}

#[test]
fn csv_export_is_revalidated_and_reported() {
    let dir = temp_dir("csv");
    let dataset = dir.join("people.csv");
    fs::write(
        &dataset,
        "name,age,active\nAda Lovelace,36,true\nAlan Turing,95,\nGrace Hopper,,false\n",
    )
    .expect("write csv");

    let result = EvaluationEngine::new(EvaluateOptions {
        unique_fields: vec!["name".to_string()],
        ..EvaluateOptions::default()
    })
    .run(&people_schema(), &dataset)
    .expect("evaluate csv");

    let summary = &result.quality.summary;
    assert_eq!(summary.total_records, 3);
    assert!((summary.validity - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.validation_errors.get("age"), Some(&2));
    assert_eq!(result.uniqueness.get("name"), Some(&100.0));
    assert!(result.quality_path.exists());
    assert!(result.report_path.exists());
    assert!(result.report.contains("| age | integer | 2 | 1 | 2 |"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn strict_mode_fails_on_invalid_records() {
    let dir = temp_dir("strict");
    let dataset = dir.join("people.jsonl");
    fs::write(
        &dataset,
        "{\"name\":\"Ada\",\"age\":30}\n{\"name\":\"Bob\",\"age\":12}\n",
    )
    .expect("write jsonl");

    let err = EvaluationEngine::new(EvaluateOptions {
        strict: true,
        ..EvaluateOptions::default()
    })
    .run(&people_schema(), &dataset)
    .expect_err("strict evaluation should fail");
    assert!(matches!(err, EvalError::InvalidRecords(1)));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = temp_dir("ext");
    let dataset = dir.join("people.parquet");
    fs::write(&dataset, b"").expect("write file");

    let err = EvaluationEngine::default()
        .run(&people_schema(), &dataset)
        .expect_err("parquet is not supported");
    assert!(matches!(err, EvalError::UnsupportedFormat(_)));

    let _ = fs::remove_dir_all(&dir);
}
