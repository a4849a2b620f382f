//! Core contracts for synthgen.
//!
//! This crate defines the schema model, record values, and the pre-generation
//! schema checks shared by the generator, evaluator, and CLI.

pub mod error;
pub mod json_schema;
pub mod record;
pub mod schema;
pub mod temporal;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
pub use json_schema::{LoadedSchema, load_schema, schema_json_schema, validate_schema_json};
pub use record::{Record, RecordData};
pub use schema::{DEFAULT_RECORD_COUNT, FieldSpec, Schema};
pub use types::{DataType, FieldValue};
pub use validation::{IssueSeverity, SchemaValidationReport, ValidationIssue, validate_schema};
