use serde::{Deserialize, Serialize};
use synthgen_core::{FieldValue, Record};

/// Column-major view of records: one row per record, columns in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

impl Table {
    pub fn from_records(columns: &[String], records: &[Record]) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.value(column).cloned().unwrap_or(FieldValue::Null))
                    .collect()
            })
            .collect();
        Self {
            columns: columns.to_vec(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, if it exists.
    pub fn column(&self, name: &str) -> Option<Vec<&FieldValue>> {
        let index = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthgen_core::RecordData;

    #[test]
    fn missing_values_become_nulls_in_column_order() {
        let mut data = RecordData::new();
        data.insert("b".to_string(), FieldValue::Int(2));
        let table = Table::from_records(&["a".to_string(), "b".to_string()], &[Record::new(data)]);
        assert_eq!(table.rows, vec![vec![FieldValue::Null, FieldValue::Int(2)]]);
        assert_eq!(table.column("b"), Some(vec![&FieldValue::Int(2)]));
        assert_eq!(table.column("c"), None);
    }
}
