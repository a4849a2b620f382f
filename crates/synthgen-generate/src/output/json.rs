use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};
use synthgen_core::Record;

use crate::errors::GenerationError;

/// Plain JSON objects keyed by column, in `columns` order.
pub fn records_to_json(columns: &[String], records: &[Record]) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            let mut object = Map::new();
            for column in columns {
                let value = record.value(column).map(|value| value.to_json()).unwrap_or(Value::Null);
                object.insert(column.clone(), value);
            }
            Value::Object(object)
        })
        .collect()
}

pub fn to_json_string(columns: &[String], records: &[Record]) -> Result<String, GenerationError> {
    Ok(serde_json::to_string_pretty(&records_to_json(columns, records))?)
}

/// One JSON object per line, newline-terminated.
pub fn to_jsonl_string(columns: &[String], records: &[Record]) -> Result<String, GenerationError> {
    let mut out = String::new();
    for row in records_to_json(columns, records) {
        out.push_str(&serde_json::to_string(&row)?);
        out.push('\n');
    }
    Ok(out)
}

/// Append serialized records to a JSONL file, creating it when absent.
pub fn write_jsonl<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<u64, GenerationError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    let mut written = 0_u64;
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthgen_core::{FieldValue, RecordData};

    #[test]
    fn jsonl_has_one_object_per_line() {
        let records: Vec<Record> = (0..3)
            .map(|index| {
                let mut data = RecordData::new();
                data.insert("id".to_string(), FieldValue::Int(index));
                Record::new(data)
            })
            .collect();
        let text = to_jsonl_string(&["id".to_string()], &records).expect("jsonl");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![r#"{"id":0}"#, r#"{"id":1}"#, r#"{"id":2}"#]);
    }
}
