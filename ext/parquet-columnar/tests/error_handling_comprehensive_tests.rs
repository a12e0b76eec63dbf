use std::io::Cursor;

use bytes::Bytes;
use parquet_columnar::format::{ColumnMetaData, FileMetaData};
use parquet_columnar::*;

mod test_helpers;
use test_helpers::*;

#[test]
fn test_rejected_rows_leave_writer_usable() {
    let schema = create_test_schema();
    let mut writer = Writer::new(Vec::new(), schema).unwrap();

    let bad_rows = vec![
        // Missing required field
        row(vec![("name", ParquetValue::string("x"))]),
        // Wrong physical type
        row(vec![
            ("id", ParquetValue::Int64(1)),
            ("active", ParquetValue::Boolean(true)),
        ]),
        // Unknown field
        row(vec![
            ("id", ParquetValue::Int32(1)),
            ("active", ParquetValue::Boolean(true)),
            ("extra", ParquetValue::Int32(2)),
        ]),
        // Null for a required field
        row(vec![
            ("id", ParquetValue::Null),
            ("active", ParquetValue::Boolean(true)),
        ]),
        // A list where a primitive is expected
        row(vec![
            ("id", ParquetValue::List(vec![ParquetValue::Int32(1)])),
            ("active", ParquetValue::Boolean(true)),
        ]),
    ];

    let good = generate_test_rows(10);
    for (i, good_row) in good.iter().enumerate() {
        writer.write_row(good_row.clone()).unwrap();
        let bad = bad_rows[i % bad_rows.len()].clone();
        let err = writer.write_row(bad).unwrap_err();
        assert!(matches!(err, ParquetError::DataMismatch(_)), "{}", err);
    }
    let bytes = writer.close().unwrap();
    assert_eq!(read_all(bytes), good);
}

#[test]
fn test_repeated_field_shape_errors() {
    let schema = SchemaBuilder::new()
        .with_field(SchemaNode::primitive("values", Repetition::Repeated, PhysicalType::Int32))
        .with_field(SchemaNode::group(
            "point",
            Repetition::Optional,
            vec![SchemaNode::primitive("x", Repetition::Required, PhysicalType::Double)],
        ))
        .build()
        .unwrap();
    let mut writer = Writer::new(Vec::new(), schema).unwrap();

    let bad_rows = vec![
        row(vec![("values", ParquetValue::Int32(1))]),
        row(vec![("values", list([ParquetValue::Int32(1), ParquetValue::Null]))]),
        row(vec![("point", ParquetValue::from(1.0))]),
        row(vec![("point", record(vec![("y", ParquetValue::from(1.0))]))]),
        row(vec![("point", record(vec![]))]),
    ];
    for bad in bad_rows {
        let err = writer.write_row(bad.clone()).unwrap_err();
        assert!(matches!(err, ParquetError::DataMismatch(_)), "{:?}: {}", bad, err);
    }
    assert_eq!(writer.total_rows(), 0);
    assert_eq!(writer.buffered_size(), 0);
}

#[test]
fn test_fixed_length_mismatch() {
    let schema = SchemaBuilder::new()
        .with_field(SchemaNode::fixed("uuid", Repetition::Required, 16))
        .build()
        .unwrap();
    let mut writer = Writer::new(Vec::new(), schema).unwrap();
    let err = writer
        .write_row(row(vec![("uuid", ParquetValue::Bytes(Bytes::from_static(b"short")))]))
        .unwrap_err();
    assert!(matches!(err, ParquetError::DataMismatch(_)));
    writer
        .write_row(row(vec![("uuid", ParquetValue::Bytes(Bytes::from(vec![7u8; 16])))]))
        .unwrap();
}

#[test]
fn test_invalid_schemas() {
    let cases = vec![
        SchemaBuilder::new(),
        SchemaBuilder::new().with_field(SchemaNode::group("empty", Repetition::Optional, vec![])),
        SchemaBuilder::new()
            .with_field(SchemaNode::primitive("a", Repetition::Required, PhysicalType::Int32))
            .with_field(SchemaNode::primitive("a", Repetition::Optional, PhysicalType::Int64)),
        SchemaBuilder::new().with_field(SchemaNode::primitive("", Repetition::Required, PhysicalType::Int32)),
        SchemaBuilder::new().with_field(
            SchemaNode::primitive("s", Repetition::Required, PhysicalType::Int32)
                .with_logical_type(LogicalType::String),
        ),
        SchemaBuilder::new().with_field(
            SchemaNode::group(
                "l",
                Repetition::Optional,
                vec![SchemaNode::primitive("e", Repetition::Optional, PhysicalType::Int32)],
            )
            .with_logical_type(LogicalType::List),
        ),
    ];
    for builder in cases {
        let err = builder.build().unwrap_err();
        assert!(matches!(err, ParquetError::Schema(_)), "{}", err);
    }
}

#[test]
fn test_invalid_writer_settings() {
    let schema = create_test_schema();
    let build = |builder: WriterBuilder| builder.build(Vec::new(), schema.clone()).err().unwrap();

    for builder in [
        WriterBuilder::new().with_page_size(0),
        WriterBuilder::new().with_row_group_size(0),
        WriterBuilder::new().with_column_encoding("missing", Encoding::Plain),
    ] {
        let err = build(builder);
        assert!(matches!(err, ParquetError::InvalidArgument(_)), "{}", err);
    }
    for builder in [
        WriterBuilder::new().with_column_encoding("value", Encoding::DeltaBinaryPacked),
        WriterBuilder::new().with_column_encoding("id", Encoding::RleDictionary),
        WriterBuilder::new().with_column_encoding("active", Encoding::DeltaByteArray),
    ] {
        let err = build(builder);
        assert!(matches!(err, ParquetError::Unsupported(_)), "{}", err);
    }
}

#[test]
fn test_not_parquet() {
    let inputs: Vec<Vec<u8>> = vec![
        Vec::new(),
        b"PAR1".to_vec(),
        b"not a parquet file at all".to_vec(),
        b"PAR1\x00\x00\x00\x00PAR1".to_vec(),
    ];
    for input in inputs {
        let err = Reader::new(Cursor::new(input)).err().unwrap();
        assert!(err.is_format_error(), "{}", err);
    }
}

#[test]
fn test_truncated_and_corrupted_files() {
    let bytes = write_rows(
        create_test_schema(),
        generate_test_rows(200),
        WriterBuilder::new().with_compression(Compression::Uncompressed),
    );

    // Missing tail
    let err = Reader::new(Cursor::new(bytes[..bytes.len() - 1].to_vec()))
        .err()
        .unwrap();
    assert!(err.is_format_error());

    // Corrupted footer bytes
    let mut corrupted = bytes.clone();
    let len = corrupted.len();
    let footer_len = u32::from_le_bytes(corrupted[len - 8..len - 4].try_into().unwrap()) as usize;
    for b in &mut corrupted[len - 8 - footer_len..len - 8] {
        *b = 0xFF;
    }
    assert!(Reader::new(Cursor::new(corrupted)).is_err());

    // Corrupted page header of the first column chunk
    let mut corrupted = bytes.clone();
    for b in &mut corrupted[4..24] {
        *b = 0xFF;
    }
    let mut reader = Reader::new(Cursor::new(corrupted)).unwrap();
    let err = reader.next_row().unwrap_err();
    assert!(err.is_format_error(), "{}", err);

    // Data removed between the header and the footer
    let mut truncated = bytes[..4].to_vec();
    truncated.extend_from_slice(&bytes[bytes.len() - 8 - footer_len..]);
    let mut reader = Reader::new(Cursor::new(truncated)).unwrap();
    assert!(reader.next_row().is_err());
}

type FooterEdit = Box<dyn Fn(&mut FileMetaData)>;

fn column_meta(metadata: &mut FileMetaData, column: usize) -> &mut ColumnMetaData {
    metadata.row_groups[0].columns[column].meta_data.as_mut().unwrap()
}

#[test]
fn test_corrupted_footer_sizes() {
    let bytes = write_rows(
        create_test_schema(),
        generate_test_rows(10),
        WriterBuilder::new().with_compression(Compression::Uncompressed),
    );
    let file_len = bytes.len() as i64;
    let unchanged = rewrite_footer(&bytes, |_| {});
    assert_eq!(read_all(unchanged), generate_test_rows(10));

    let edits: Vec<FooterEdit> = vec![
        Box::new(|m: &mut FileMetaData| column_meta(m, 0).total_compressed_size = i64::MAX / 2),
        Box::new(|m: &mut FileMetaData| column_meta(m, 0).total_compressed_size = -1),
        Box::new(move |m: &mut FileMetaData| column_meta(m, 1).total_compressed_size = file_len),
        Box::new(|m: &mut FileMetaData| column_meta(m, 0).num_values = 11),
        Box::new(|m: &mut FileMetaData| column_meta(m, 2).num_values = i64::MAX),
        Box::new(|m: &mut FileMetaData| column_meta(m, 3).num_values = -5),
        Box::new(move |m: &mut FileMetaData| column_meta(m, 0).data_page_offset = file_len * 2),
        Box::new(move |m: &mut FileMetaData| {
            let meta = column_meta(m, 1);
            meta.dictionary_page_offset = Some(file_len + 50);
            meta.data_page_offset = file_len + 100;
        }),
        Box::new(|m: &mut FileMetaData| column_meta(m, 1).physical_type = PhysicalType::Int64),
    ];
    for (i, edit) in edits.iter().enumerate() {
        let corrupted = rewrite_footer(&bytes, edit);
        let mut reader = Reader::new(Cursor::new(corrupted)).unwrap();
        let err = reader.next_row().unwrap_err();
        assert!(err.is_format_error(), "edit {}: {}", i, err);
    }
}

#[test]
fn test_corrupted_footer_schema() {
    let bytes = write_rows(create_test_schema(), generate_test_rows(10), WriterBuilder::new());

    let edits: Vec<FooterEdit> = vec![
        Box::new(|m: &mut FileMetaData| m.schema[0].num_children = Some(i32::MAX)),
        Box::new(|m: &mut FileMetaData| m.schema[0].num_children = Some(-1)),
        Box::new(|m: &mut FileMetaData| m.schema[0].num_children = Some(5)),
        Box::new(|m: &mut FileMetaData| m.schema[1].num_children = Some(i32::MAX)),
        Box::new(|m: &mut FileMetaData| m.schema[2].repetition = None),
        Box::new(|m: &mut FileMetaData| m.schema.clear()),
        Box::new(|m: &mut FileMetaData| m.row_groups[0].columns.truncate(2)),
        Box::new(|m: &mut FileMetaData| m.row_groups[0].num_rows = -1),
    ];
    for (i, edit) in edits.iter().enumerate() {
        let corrupted = rewrite_footer(&bytes, edit);
        let err = Reader::new(Cursor::new(corrupted)).err().unwrap();
        assert!(err.is_format_error(), "edit {}: {}", i, err);
    }
}

#[test]
fn test_iterator_stops_after_error() {
    let bytes = write_rows(
        create_test_schema(),
        generate_test_rows(100),
        WriterBuilder::new().with_compression(Compression::Uncompressed),
    );
    let mut corrupted = bytes;
    for b in &mut corrupted[4..24] {
        *b = 0xFF;
    }
    let mut reader = Reader::new(Cursor::new(corrupted)).unwrap();
    let results: Vec<_> = reader.read_rows().collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn test_memory_ceiling() {
    let rows = generate_test_rows(5_000);
    let bytes = write_rows(
        create_test_schema(),
        rows.clone(),
        WriterBuilder::new()
            .with_compression(Compression::Uncompressed)
            .with_dictionary(false),
    );

    let mut reader = ReaderBuilder::new()
        .with_memory_ceiling(1024)
        .build(Cursor::new(bytes.clone()))
        .unwrap();
    let err = reader.next_row().unwrap_err();
    match err {
        ParquetError::ResourceExhausted { ceiling, .. } => assert_eq!(ceiling, 1024),
        other => panic!("expected ResourceExhausted, got {}", other),
    }

    let mut reader = ReaderBuilder::new()
        .with_memory_ceiling(64 * 1024 * 1024)
        .build(Cursor::new(bytes))
        .unwrap();
    let read = reader.read_rows().collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(read, rows);
    assert!(reader.memory_used() <= 64 * 1024 * 1024);
}

#[test]
fn test_out_of_range_row_group() {
    let bytes = write_rows(create_test_schema(), generate_test_rows(3), WriterBuilder::new());
    let mut reader = Reader::new(Cursor::new(bytes)).unwrap();
    assert!(matches!(
        reader.read_row_group(1).unwrap_err(),
        ParquetError::InvalidArgument(_)
    ));
    assert!(reader.column_chunk_metadata(1, "id").is_err());
}
