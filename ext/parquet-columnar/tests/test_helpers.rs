#![allow(dead_code)]

use std::fs::File;
use std::io::Cursor;
use std::sync::Arc;

use parquet_columnar::*;
use tempfile::NamedTempFile;

/// Builds a row from name/value pairs
pub fn row(fields: Vec<(&str, ParquetValue)>) -> Row {
    fields
        .into_iter()
        .map(|(name, value)| (Arc::<str>::from(name), value))
        .collect()
}

pub fn record(fields: Vec<(&str, ParquetValue)>) -> ParquetValue {
    ParquetValue::Record(row(fields))
}

pub fn list<I: IntoIterator<Item = ParquetValue>>(items: I) -> ParquetValue {
    ParquetValue::List(items.into_iter().collect())
}

/// Create a test schema with common field types
pub fn create_test_schema() -> Schema {
    SchemaBuilder::new()
        .with_field(SchemaNode::primitive("id", Repetition::Required, PhysicalType::Int32))
        .with_field(SchemaNode::string("name", Repetition::Optional))
        .with_field(SchemaNode::primitive("value", Repetition::Optional, PhysicalType::Double))
        .with_field(SchemaNode::primitive("active", Repetition::Required, PhysicalType::Boolean))
        .build()
        .unwrap()
}

/// Generate test rows with sequential data; every fourth row has no name
pub fn generate_test_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let mut fields = vec![("id", ParquetValue::Int32(i as i32))];
            if i % 4 != 0 {
                fields.push(("name", ParquetValue::string(format!("name_{}", i))));
            }
            fields.push(("value", ParquetValue::from(i as f64 * 1.5)));
            fields.push(("active", ParquetValue::Boolean(i % 2 == 0)));
            row(fields)
        })
        .collect()
}

/// Writes rows into an in-memory file
pub fn write_rows(schema: Schema, rows: Vec<Row>, builder: WriterBuilder) -> Vec<u8> {
    let mut writer = builder.build(Vec::new(), schema).unwrap();
    writer.write_rows(rows).unwrap();
    writer.close().unwrap()
}

/// Reads every row of an in-memory file
pub fn read_all(bytes: Vec<u8>) -> Vec<Row> {
    let mut reader = Reader::new(Cursor::new(bytes)).unwrap();
    reader.read_rows().collect::<Result<Vec<_>>>().unwrap()
}

/// Decodes the footer of an in-memory file, applies `edit` and writes the
/// file back with the re-encoded footer.
pub fn rewrite_footer<F: FnOnce(&mut format::FileMetaData)>(bytes: &[u8], edit: F) -> Vec<u8> {
    let len = bytes.len();
    let footer_len = u32::from_le_bytes(bytes[len - 8..len - 4].try_into().unwrap()) as usize;
    let footer_start = len - 8 - footer_len;
    let (mut metadata, _) =
        format::read_record::<format::FileMetaData>(&bytes[footer_start..len - 8]).unwrap();
    edit(&mut metadata);

    let mut out = bytes[..footer_start].to_vec();
    let mut footer = Vec::new();
    format::write_record(&metadata, &mut footer).unwrap();
    out.extend_from_slice(&footer);
    out.extend_from_slice(&(footer.len() as u32).to_le_bytes());
    out.extend_from_slice(b"PAR1");
    out
}

/// Perform a roundtrip test and verify data integrity
pub fn test_roundtrip(rows: Vec<Row>, schema: Schema) -> Result<()> {
    test_roundtrip_with_options(rows, schema, WriterBuilder::new())
}

/// Perform a roundtrip test through a temporary file with custom writer options
pub fn test_roundtrip_with_options(
    rows: Vec<Row>,
    schema: Schema,
    builder: WriterBuilder,
) -> Result<()> {
    let temp_file = NamedTempFile::new()?;

    let writer = builder.build(File::create(temp_file.path())?, schema.clone())?;
    let mut writer = writer;
    writer.write_rows(rows.clone())?;
    writer.close()?;

    let mut reader = Reader::new(File::open(temp_file.path())?)?;
    assert_eq!(reader.schema(), &schema);
    assert_eq!(reader.num_rows(), rows.len() as u64);

    let read_rows = reader.read_rows().collect::<Result<Vec<_>>>()?;
    assert_eq!(rows.len(), read_rows.len(), "Row count mismatch");
    for (i, (original, read)) in rows.iter().zip(read_rows.iter()).enumerate() {
        assert_eq!(original, read, "Row {} mismatch", i);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_work() {
        let schema = create_test_schema();
        let rows = generate_test_rows(10);
        assert_eq!(rows.len(), 10);

        test_roundtrip(rows, schema).unwrap();
    }
}
