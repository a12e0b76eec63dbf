use std::io::Cursor;

use parquet_columnar::*;

mod test_helpers;
use test_helpers::*;

fn nested_schema() -> Schema {
    SchemaBuilder::new()
        .with_field(SchemaNode::primitive("id", Repetition::Required, PhysicalType::Int64))
        .with_field(SchemaNode::group(
            "person",
            Repetition::Optional,
            vec![
                SchemaNode::string("name", Repetition::Required),
                SchemaNode::primitive("age", Repetition::Optional, PhysicalType::Int32),
                SchemaNode::group(
                    "address",
                    Repetition::Optional,
                    vec![
                        SchemaNode::string("city", Repetition::Optional),
                        SchemaNode::string("zip", Repetition::Optional),
                    ],
                ),
            ],
        ))
        .with_field(SchemaNode::group(
            "scores",
            Repetition::Repeated,
            vec![SchemaNode::primitive("points", Repetition::Required, PhysicalType::Int32)],
        ))
        .build()
        .unwrap()
}

fn nested_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            row(vec![
                ("id", ParquetValue::Int64(i as i64)),
                (
                    "person",
                    record(vec![
                        ("name", ParquetValue::string(format!("person_{}", i))),
                        ("age", ParquetValue::Int32(i as i32 % 90)),
                        (
                            "address",
                            record(vec![
                                ("city", ParquetValue::string(format!("city_{}", i % 4))),
                                ("zip", ParquetValue::string(format!("{:05}", i))),
                            ]),
                        ),
                    ]),
                ),
                (
                    "scores",
                    list((0..i % 3).map(|j| record(vec![("points", ParquetValue::Int32(j as i32))]))),
                ),
            ])
        })
        .collect()
}

fn project(bytes: Vec<u8>, columns: &[&str]) -> Vec<Row> {
    let mut reader = ReaderBuilder::new()
        .with_projection(columns.iter().copied())
        .build(Cursor::new(bytes))
        .unwrap();
    reader.read_rows().collect::<Result<Vec<_>>>().unwrap()
}

#[test]
fn test_projection_keeps_unrequested_groups_empty() {
    let rows = nested_rows(100);
    let bytes = write_rows(nested_schema(), rows.clone(), WriterBuilder::new());

    let projected = project(bytes, &["id", "person.address.city"]);
    assert_eq!(projected.len(), 100);
    for (i, (original, read)) in rows.iter().zip(&projected).enumerate() {
        assert_eq!(read["id"], original["id"]);
        let person = read["person"].as_record().unwrap();
        assert_eq!(person.len(), 1, "row {}", i);
        let address = person["address"].as_record().unwrap();
        assert_eq!(
            address.get("city"),
            original["person"].as_record().unwrap()["address"]
                .as_record()
                .unwrap()
                .get("city")
        );
        assert!(address.get("zip").is_none());
        assert_eq!(read["scores"], ParquetValue::Record(Row::new()));
    }
}

#[test]
fn test_projection_by_group_path() {
    let rows = nested_rows(20);
    let bytes = write_rows(nested_schema(), rows.clone(), WriterBuilder::new());

    let projected = project(bytes, &["scores"]);
    for (original, read) in rows.iter().zip(&projected) {
        assert!(read.get("id").is_none());
        assert_eq!(read["person"], ParquetValue::Record(Row::new()));
        if original["scores"].as_list().unwrap().is_empty() {
            assert!(read.get("scores").is_none());
        } else {
            assert_eq!(read["scores"], original["scores"]);
        }
    }
}

#[test]
fn test_projection_of_flat_columns() {
    let rows = generate_test_rows(50);
    let bytes = write_rows(create_test_schema(), rows.clone(), WriterBuilder::new());

    let projected = project(bytes, &["name", "active"]);
    for (original, read) in rows.iter().zip(&projected) {
        assert_eq!(read.get("name"), original.get("name"));
        assert_eq!(read["active"], original["active"]);
        assert!(read.get("id").is_none());
        assert!(read.get("value").is_none());
    }
}

#[test]
fn test_projection_only_reads_selected_chunks() {
    let rows = nested_rows(200);
    let bytes = write_rows(
        nested_schema(),
        rows,
        WriterBuilder::new().with_compression(Compression::Uncompressed),
    );

    let mut full = Reader::new(Cursor::new(bytes.clone())).unwrap();
    full.next_row().unwrap();
    let mut narrow = ReaderBuilder::new()
        .with_projection(["id"])
        .build(Cursor::new(bytes))
        .unwrap();
    narrow.next_row().unwrap();
    assert!(narrow.memory_used() < full.memory_used());
}

#[test]
fn test_unknown_projection_is_rejected() {
    let bytes = write_rows(create_test_schema(), generate_test_rows(5), WriterBuilder::new());
    let err = ReaderBuilder::new()
        .with_projection(["missing"])
        .build(Cursor::new(bytes))
        .err()
        .unwrap();
    assert!(matches!(err, ParquetError::InvalidArgument(_)));
}
