//! Test utilities for parquet-columnar

use std::sync::Arc;

use crate::basic::{PhysicalType, Repetition};
use crate::{ParquetValue, Row, Schema, SchemaBuilder, SchemaNode};

/// Builds a row from name/value pairs, keeping their order.
pub fn row(fields: Vec<(&str, ParquetValue)>) -> Row {
    fields
        .into_iter()
        .map(|(name, value)| (Arc::<str>::from(name), value))
        .collect()
}

/// Same as [`row`], wrapped as a group value.
pub fn record(fields: Vec<(&str, ParquetValue)>) -> ParquetValue {
    ParquetValue::Record(row(fields))
}

pub fn list<I: IntoIterator<Item = ParquetValue>>(items: I) -> ParquetValue {
    ParquetValue::List(items.into_iter().collect())
}

/// Flat schema with one required and three optional columns.
pub fn sample_schema() -> Schema {
    SchemaBuilder::new()
        .with_field(SchemaNode::primitive("id", Repetition::Required, PhysicalType::Int64))
        .with_field(SchemaNode::string("name", Repetition::Optional))
        .with_field(SchemaNode::primitive("age", Repetition::Optional, PhysicalType::Int32))
        .with_field(SchemaNode::primitive("salary", Repetition::Optional, PhysicalType::Double))
        .build()
        .unwrap()
}

/// Rows for [`sample_schema`]; every third row has no name and every fifth no age.
pub fn sample_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let mut fields = vec![("id", ParquetValue::Int64(i as i64))];
            if i % 3 != 0 {
                fields.push(("name", ParquetValue::string(format!("name_{}", i % 7))));
            }
            if i % 5 != 0 {
                fields.push(("age", ParquetValue::Int32(20 + (i % 50) as i32)));
            }
            fields.push(("salary", ParquetValue::from(1000.0 + i as f64 * 0.5)));
            row(fields)
        })
        .collect()
}

/// The document schema of the Dremel paper, with integer URLs.
pub fn dremel_schema() -> Schema {
    SchemaBuilder::new()
        .with_field(SchemaNode::primitive("DocId", Repetition::Required, PhysicalType::Int64))
        .with_field(SchemaNode::group(
            "Links",
            Repetition::Optional,
            vec![
                SchemaNode::primitive("Backward", Repetition::Repeated, PhysicalType::Int64),
                SchemaNode::primitive("Forward", Repetition::Repeated, PhysicalType::Int64),
            ],
        ))
        .with_field(SchemaNode::group(
            "Name",
            Repetition::Repeated,
            vec![
                SchemaNode::group(
                    "Language",
                    Repetition::Repeated,
                    vec![
                        SchemaNode::primitive("Code", Repetition::Required, PhysicalType::Int64),
                        SchemaNode::primitive("Country", Repetition::Optional, PhysicalType::Int64),
                    ],
                ),
                SchemaNode::primitive("URL", Repetition::Optional, PhysicalType::Int64),
            ],
        ))
        .build()
        .unwrap()
}

/// First document of the Dremel paper.
pub fn dremel_document_1() -> Row {
    let int = ParquetValue::Int64;
    row(vec![
        ("DocId", int(10)),
        ("Links", record(vec![("Forward", list([int(20), int(40), int(60)]))])),
        (
            "Name",
            list([
                record(vec![
                    (
                        "Language",
                        list([
                            record(vec![("Code", int(1)), ("Country", int(100))]),
                            record(vec![("Code", int(2))]),
                        ]),
                    ),
                    ("URL", int(10)),
                ]),
                record(vec![("URL", int(11))]),
                record(vec![(
                    "Language",
                    list([record(vec![("Code", int(3)), ("Country", int(101))])]),
                )]),
            ]),
        ),
    ])
}

/// Second document of the Dremel paper.
pub fn dremel_document_2() -> Row {
    let int = ParquetValue::Int64;
    row(vec![
        ("DocId", int(20)),
        (
            "Links",
            record(vec![
                ("Backward", list([int(10), int(30)])),
                ("Forward", list([int(80)])),
            ]),
        ),
        ("Name", list([record(vec![("URL", int(12))])])),
    ])
}
