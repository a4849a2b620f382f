//! Storage targets for generated records.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use synthgen_core::{Record, Schema};
use tracing::{info, warn};

use crate::errors::GenerationError;
use crate::output::write_jsonl;

/// Outcome of one `store` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkReport {
    pub success: bool,
    pub inserted_count: u64,
    pub errors: Vec<String>,
}

impl SinkReport {
    fn stored(inserted_count: u64) -> Self {
        Self {
            success: true,
            inserted_count,
            errors: Vec::new(),
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            inserted_count: 0,
            errors: vec![error.into()],
        }
    }
}

pub trait RecordSink {
    fn store(&mut self, schema: &Schema, records: &[Record]) -> SinkReport;
}

/// Keeps records in memory, grouped by schema name.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    tables: BTreeMap<String, Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self, schema_name: &str) -> &[Record] {
        self.tables
            .get(schema_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl RecordSink for MemorySink {
    fn store(&mut self, schema: &Schema, records: &[Record]) -> SinkReport {
        self.tables
            .entry(schema.name.clone())
            .or_default()
            .extend_from_slice(records);
        SinkReport::stored(records.len() as u64)
    }
}

/// Appends records to `<dir>/<schema>.jsonl`, writing the schema document
/// next to it the first time a schema is seen.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    dir: PathBuf,
    initialized: HashSet<String>,
}

impl JsonlSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            initialized: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn data_path(&self, schema_name: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", file_stem(schema_name)))
    }

    pub fn schema_path(&self, schema_name: &str) -> PathBuf {
        self.dir.join(format!("{}.schema.json", file_stem(schema_name)))
    }

    fn try_store(&mut self, schema: &Schema, records: &[Record]) -> Result<u64, GenerationError> {
        std::fs::create_dir_all(&self.dir)?;
        if !self.initialized.contains(&schema.name) {
            let schema_path = self.schema_path(&schema.name);
            if !schema_path.exists() {
                std::fs::write(&schema_path, serde_json::to_vec_pretty(schema)?)?;
            }
            self.initialized.insert(schema.name.clone());
        }
        write_jsonl(&self.data_path(&schema.name), records)
    }
}

impl RecordSink for JsonlSink {
    fn store(&mut self, schema: &Schema, records: &[Record]) -> SinkReport {
        match self.try_store(schema, records) {
            Ok(inserted) => {
                info!(
                    schema = %schema.name,
                    inserted,
                    path = %self.data_path(&schema.name).display(),
                    "records stored"
                );
                SinkReport::stored(inserted)
            }
            Err(err) => {
                warn!(schema = %schema.name, error = %err, "failed to store records");
                SinkReport::failed(err.to_string())
            }
        }
    }
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "dataset".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stems_are_filesystem_safe() {
        assert_eq!(file_stem("sales/2024 q1"), "sales_2024_q1");
        assert_eq!(file_stem(""), "dataset");
    }

    #[test]
    fn memory_sink_groups_by_schema() {
        let schema = Schema::new("users", Vec::new());
        let mut sink = MemorySink::new();
        let report = sink.store(&schema, &[Record::new(Default::default())]);
        assert!(report.success);
        assert_eq!(report.inserted_count, 1);
        assert_eq!(sink.records("users").len(), 1);
        assert!(sink.records("orders").is_empty());
    }
}
