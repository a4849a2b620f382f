//! Materialized forms of a generated dataset.

pub mod csv;
pub mod json;
pub mod table;

pub use self::csv::{write_csv, write_records_csv};
pub use self::json::{records_to_json, to_json_string, to_jsonl_string, write_jsonl};
pub use self::table::Table;
