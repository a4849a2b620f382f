use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use synthgen_core::Record;

/// Write records as CSV with a header row in `columns` order.
///
/// Nulls and missing values become empty cells. Returns bytes written.
pub fn write_records_csv(
    path: &Path,
    columns: &[String],
    records: &[Record],
) -> Result<u64, csv::Error> {
    let file = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    write_csv(CountingWriter::new(file), columns, records)
        .map(|counting| counting.bytes_written())
}

/// Write CSV into any writer and hand it back once flushed.
pub fn write_csv<W: Write>(
    out: W,
    columns: &[String],
    records: &[Record],
) -> Result<W, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    writer.write_record(columns)?;

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| record.value(column).map(|value| value.to_csv()).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }

    writer.flush()?;
    writer.into_inner().map_err(|err| err.into_error().into())
}

pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthgen_core::{FieldValue, RecordData};

    #[test]
    fn writes_header_and_quotes_commas() {
        let mut data = RecordData::new();
        data.insert("name".to_string(), FieldValue::from("Silva, Ana"));
        data.insert("age".to_string(), FieldValue::Int(30));
        let columns = vec!["name".to_string(), "age".to_string(), "note".to_string()];
        let bytes = write_csv(Vec::new(), &columns, &[Record::new(data)]).expect("write csv");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(text, "name,age,note\n\"Silva, Ana\",30,\n");
    }
}
