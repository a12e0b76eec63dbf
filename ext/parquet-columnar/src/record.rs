//! Record shredding and assembly.
//!
//! Shredding walks a [`Row`] along the column tree and emits one
//! `(value, repetition level, definition level)` slot per leaf occurrence.
//! Assembly is the inverse walk over decoded [`ColumnData`], driven by one
//! [`LeafCursor`] per leaf column.
//!
//! Fields that are absent and fields that are `Null` are written the same
//! way; assembled rows omit them.

use std::sync::Arc;

use crate::basic::Repetition;
use crate::column::{Column, ColumnKind, ColumnTree, LeafDescriptor};
use crate::column_store::{check_value, ColumnData, ColumnStore};
use crate::{ParquetError, ParquetValue, Result, Row};

/// Receives the slots produced by the shredding walk.
trait SlotSink {
    fn slot(&mut self, leaf: usize, value: &ParquetValue, rep_level: u8, def_level: u8)
        -> Result<()>;
}

/// Type checks values without buffering anything.
struct Validator<'a> {
    leaves: &'a [LeafDescriptor],
}

impl SlotSink for Validator<'_> {
    fn slot(&mut self, leaf: usize, value: &ParquetValue, _: u8, _: u8) -> Result<()> {
        let descriptor = self
            .leaves
            .get(leaf)
            .ok_or_else(|| ParquetError::internal(format!("leaf {} out of range", leaf)))?;
        if value.is_null() {
            Ok(())
        } else {
            check_value(descriptor, value)
        }
    }
}

struct Stores<'a> {
    stores: &'a mut [ColumnStore],
}

impl SlotSink for Stores<'_> {
    fn slot(&mut self, leaf: usize, value: &ParquetValue, rep_level: u8, def_level: u8) -> Result<()> {
        self.stores
            .get_mut(leaf)
            .ok_or_else(|| ParquetError::internal(format!("no column store for leaf {}", leaf)))?
            .push(value, rep_level, def_level)
    }
}

/// Checks that `row` can be shredded into `tree` without buffering it.
pub fn validate(tree: &ColumnTree, row: &Row) -> Result<()> {
    let mut sink = Validator {
        leaves: tree.leaves(),
    };
    shred_fields(tree.fields(), row, 0, 0, &mut sink)
}

/// Shreds `row` into `stores`, one store per leaf in leaf order.
///
/// The row is validated first; a rejected row leaves every store untouched.
pub fn shred(tree: &ColumnTree, row: &Row, stores: &mut [ColumnStore]) -> Result<()> {
    if stores.len() != tree.leaf_count() {
        return Err(ParquetError::internal(format!(
            "{} column stores for {} leaves",
            stores.len(),
            tree.leaf_count()
        )));
    }
    validate(tree, row)?;
    shred_fields(tree.fields(), row, 0, 0, &mut Stores { stores })
}

fn shred_fields<S: SlotSink>(
    fields: &[Column],
    row: &Row,
    rep_level: u8,
    def_level: u8,
    sink: &mut S,
) -> Result<()> {
    if let Some(unknown) = row
        .keys()
        .find(|key| !fields.iter().any(|f| f.name() == *key))
    {
        return Err(ParquetError::data_mismatch(format!(
            "field '{}' is not in the schema",
            unknown
        )));
    }
    for field in fields {
        shred_node(field, row.get(field.name()), rep_level, def_level, sink)?;
    }
    Ok(())
}

fn shred_node<S: SlotSink>(
    column: &Column,
    value: Option<&ParquetValue>,
    rep_level: u8,
    def_level: u8,
    sink: &mut S,
) -> Result<()> {
    let value = value.filter(|v| !v.is_null());
    match (column.repetition(), value) {
        (Repetition::Required, None) => Err(ParquetError::data_mismatch(format!(
            "required value is missing for field '{}'",
            column.name()
        ))),
        (Repetition::Optional, None) | (Repetition::Repeated, None) => {
            fill_nulls(column, rep_level, def_level, sink)
        }
        (Repetition::Required, Some(v)) | (Repetition::Optional, Some(v)) => {
            shred_present(column, v, rep_level, sink)
        }
        (Repetition::Repeated, Some(ParquetValue::List(items))) => {
            if items.is_empty() {
                return fill_nulls(column, rep_level, def_level, sink);
            }
            for (i, item) in items.iter().enumerate() {
                if item.is_null() {
                    return Err(ParquetError::data_mismatch(format!(
                        "repeated field '{}' holds a null element at {}",
                        column.name(),
                        i
                    )));
                }
                let r = if i == 0 {
                    rep_level
                } else {
                    column.max_rep_level()
                };
                shred_present(column, item, r, sink)?;
            }
            Ok(())
        }
        (Repetition::Repeated, Some(other)) => Err(ParquetError::data_mismatch(format!(
            "repeated field '{}' expects a List, got {}",
            column.name(),
            other.type_name()
        ))),
    }
}

fn shred_present<S: SlotSink>(
    column: &Column,
    value: &ParquetValue,
    rep_level: u8,
    sink: &mut S,
) -> Result<()> {
    match (column.kind(), value) {
        (ColumnKind::Leaf(leaf), _) => sink.slot(*leaf, value, rep_level, column.max_def_level()),
        (ColumnKind::Group(children), ParquetValue::Record(row)) => {
            shred_fields(children, row, rep_level, column.max_def_level(), sink)
        }
        (ColumnKind::Group(_), other) => Err(ParquetError::data_mismatch(format!(
            "group '{}' expects a Record, got {}",
            column.name(),
            other.type_name()
        ))),
    }
}

/// One null slot for every leaf below an absent node, at the levels of the
/// closest present ancestor.
fn fill_nulls<S: SlotSink>(column: &Column, rep_level: u8, def_level: u8, sink: &mut S) -> Result<()> {
    let mut leaves = Vec::new();
    column.collect_leaves(&mut leaves);
    for leaf in leaves {
        sink.slot(leaf, &ParquetValue::Null, rep_level, def_level)?;
    }
    Ok(())
}

/// Read position within one leaf column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeafCursor {
    /// Next level entry.
    pub level: usize,
    /// Next non-null value.
    pub value: usize,
}

/// Rebuilds rows from the decoded columns of one row group.
///
/// `columns` holds one entry per leaf; entries of leaves outside the
/// projection are never read and may be empty.
#[derive(Debug)]
pub struct RecordAssembler {
    columns: Vec<ColumnData>,
    cursors: Vec<LeafCursor>,
    remaining: usize,
}

impl RecordAssembler {
    pub fn new(tree: &ColumnTree, columns: Vec<ColumnData>, num_rows: usize) -> Result<Self> {
        if columns.len() != tree.leaf_count() {
            return Err(ParquetError::internal(format!(
                "{} decoded columns for {} leaves",
                columns.len(),
                tree.leaf_count()
            )));
        }
        let cursors = vec![LeafCursor::default(); columns.len()];
        Ok(RecordAssembler {
            columns,
            cursors,
            remaining: num_rows,
        })
    }

    /// Rows not assembled yet.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn cursor(&self, leaf: usize) -> Option<LeafCursor> {
        self.cursors.get(leaf).copied()
    }

    /// Assembles the next row, or `None` once every row has been read.
    pub fn next_record(&mut self, tree: &ColumnTree) -> Result<Option<Row>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        for leaf in tree.selected_leaves() {
            match self.peek(leaf) {
                Some((0, _)) => {}
                Some((r, _)) => {
                    return Err(ParquetError::format(format!(
                        "column '{}' continues a record with repetition level {}",
                        leaf_path(tree, leaf),
                        r
                    )))
                }
                None => {
                    return Err(ParquetError::format(format!(
                        "column '{}' ended with {} rows left",
                        leaf_path(tree, leaf),
                        self.remaining
                    )))
                }
            }
        }
        let row = self.read_fields(tree, tree.fields())?;
        self.remaining -= 1;
        Ok(Some(row))
    }

    fn peek(&self, leaf: usize) -> Option<(u8, u8)> {
        let column = self.columns.get(leaf)?;
        let at = self.cursors.get(leaf)?.level;
        Some((*column.rep_levels().get(at)?, *column.def_levels().get(at)?))
    }

    fn peek_def(&self, tree: &ColumnTree, leaf: usize) -> Result<u8> {
        self.peek(leaf).map(|(_, d)| d).ok_or_else(|| {
            ParquetError::format(format!(
                "column '{}' has fewer levels than its siblings",
                leaf_path(tree, leaf)
            ))
        })
    }

    fn read_fields(&mut self, tree: &ColumnTree, fields: &[Column]) -> Result<Row> {
        let mut row = Row::with_capacity(fields.len());
        for field in fields {
            if !field.is_selected() {
                if let ColumnKind::Group(children) = field.kind() {
                    row.insert(
                        Arc::clone(field.name()),
                        ParquetValue::Record(self.read_fields(tree, children)?),
                    );
                }
                continue;
            }
            if let Some(value) = self.read_node(tree, field)? {
                row.insert(Arc::clone(field.name()), value);
            }
        }
        Ok(row)
    }

    fn read_node(&mut self, tree: &ColumnTree, column: &Column) -> Result<Option<ParquetValue>> {
        let leaf = column.first_selected_leaf().ok_or_else(|| {
            ParquetError::internal(format!("field '{}' has no selected leaf", column.name()))
        })?;
        match column.repetition() {
            Repetition::Required => self.read_one(tree, column).map(Some),
            Repetition::Optional => {
                if self.peek_def(tree, leaf)? < column.max_def_level() {
                    self.skip_absent(column);
                    Ok(None)
                } else {
                    self.read_one(tree, column).map(Some)
                }
            }
            Repetition::Repeated => {
                if self.peek_def(tree, leaf)? < column.max_def_level() {
                    self.skip_absent(column);
                    return Ok(None);
                }
                let mut items = vec![self.read_one(tree, column)?];
                while let Some((r, _)) = self.peek(leaf) {
                    if r < column.max_rep_level() {
                        break;
                    }
                    items.push(self.read_one(tree, column)?);
                }
                Ok(Some(ParquetValue::List(items)))
            }
        }
    }

    fn read_one(&mut self, tree: &ColumnTree, column: &Column) -> Result<ParquetValue> {
        match column.kind() {
            ColumnKind::Group(children) => Ok(ParquetValue::Record(self.read_fields(tree, children)?)),
            ColumnKind::Leaf(leaf) => {
                let leaf = *leaf;
                let def_level = self.peek_def(tree, leaf)?;
                if def_level != column.max_def_level() {
                    return Err(ParquetError::format(format!(
                        "column '{}' expected a value at definition level {}, found {}",
                        leaf_path(tree, leaf),
                        column.max_def_level(),
                        def_level
                    )));
                }
                let cursor = &mut self.cursors[leaf];
                let value = self.columns[leaf]
                    .values()
                    .get(cursor.value)
                    .cloned()
                    .ok_or_else(|| {
                        ParquetError::format(format!(
                            "column '{}' ran out of values",
                            leaf_path(tree, leaf)
                        ))
                    })?;
                cursor.level += 1;
                cursor.value += 1;
                Ok(value)
            }
        }
    }

    /// Steps over the null slot every selected leaf below `column` holds
    /// for an absent occurrence.
    fn skip_absent(&mut self, column: &Column) {
        let mut leaves = Vec::new();
        column.collect_selected_leaves(&mut leaves);
        for leaf in leaves {
            if let Some(cursor) = self.cursors.get_mut(leaf) {
                cursor.level += 1;
            }
        }
    }
}

fn leaf_path(tree: &ColumnTree, leaf: usize) -> String {
    tree.leaf(leaf)
        .map(LeafDescriptor::dotted_path)
        .unwrap_or_else(|| format!("#{}", leaf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::PhysicalType;
    use crate::test_utils::{dremel_document_1, dremel_document_2, dremel_schema, list, record, row};
    use crate::{SchemaBuilder, SchemaNode};

    fn stores_for(tree: &ColumnTree) -> Vec<ColumnStore> {
        tree.leaves()
            .iter()
            .map(|l| ColumnStore::new(l.clone()).unwrap())
            .collect()
    }

    fn decoded(tree: &ColumnTree, stores: &[ColumnStore]) -> Vec<ColumnData> {
        tree.leaves()
            .iter()
            .zip(stores)
            .map(|(leaf, store)| {
                let mut data = ColumnData::new(leaf);
                data.push_page(
                    store.rep_levels().iter().map(|r| r as u8).collect(),
                    store.def_levels().iter().map(|d| d as u8).collect(),
                    store.values().values_in(0..store.values().len()),
                )
                .unwrap();
                data
            })
            .collect()
    }

    fn round_trip(tree: &ColumnTree, rows: &[Row]) -> Vec<Row> {
        let mut stores = stores_for(tree);
        for r in rows {
            shred(tree, r, &mut stores).unwrap();
        }
        let mut assembler = RecordAssembler::new(tree, decoded(tree, &stores), rows.len()).unwrap();
        let mut out = Vec::new();
        while let Some(r) = assembler.next_record(tree).unwrap() {
            out.push(r);
        }
        out
    }

    #[test]
    fn dremel_document_levels() {
        let tree = ColumnTree::new(&dremel_schema()).unwrap();
        let mut stores = stores_for(&tree);
        shred(&tree, &dremel_document_1(), &mut stores).unwrap();

        let code = &stores[tree.leaf_index("Name.Language.Code").unwrap()];
        assert_eq!(
            code.values().values_in(0..code.values().len()),
            vec![ParquetValue::Int64(1), ParquetValue::Int64(2), ParquetValue::Int64(3)]
        );
        assert_eq!(code.def_levels().iter().collect::<Vec<_>>(), vec![2, 2, 1, 2]);
        assert_eq!(code.rep_levels().iter().collect::<Vec<_>>(), vec![0, 2, 1, 1]);

        let country = &stores[tree.leaf_index("Name.Language.Country").unwrap()];
        assert_eq!(country.def_levels().iter().collect::<Vec<_>>(), vec![3, 2, 1, 3]);
        assert_eq!(country.rep_levels().iter().collect::<Vec<_>>(), vec![0, 2, 1, 1]);

        let backward = &stores[tree.leaf_index("Links.Backward").unwrap()];
        assert_eq!(backward.def_levels().iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(backward.null_count(), 1);

        let url = &stores[tree.leaf_index("Name.URL").unwrap()];
        assert_eq!(url.def_levels().iter().collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(url.rep_levels().iter().collect::<Vec<_>>(), vec![0, 1, 1]);
    }

    #[test]
    fn dremel_documents_round_trip() {
        let tree = ColumnTree::new(&dremel_schema()).unwrap();
        let rows = vec![dremel_document_1(), dremel_document_2()];
        assert_eq!(round_trip(&tree, &rows), rows);
    }

    #[test]
    fn absent_and_empty_values_are_omitted() {
        let tree = ColumnTree::new(&dremel_schema()).unwrap();
        let int = ParquetValue::Int64;
        let written = vec![
            row(vec![("DocId", int(1)), ("Links", ParquetValue::Null), ("Name", list([]))]),
            row(vec![
                ("DocId", int(2)),
                ("Links", record(vec![])),
                ("Name", list([record(vec![("Language", list([]))])])),
            ]),
        ];
        let expected = vec![
            row(vec![("DocId", int(1))]),
            row(vec![
                ("DocId", int(2)),
                ("Links", record(vec![])),
                ("Name", list([record(vec![])])),
            ]),
        ];
        assert_eq!(round_trip(&tree, &written), expected);
    }

    #[test]
    fn missing_required_value_is_rejected() {
        let tree = ColumnTree::new(&dremel_schema()).unwrap();
        let mut stores = stores_for(&tree);
        let err = shred(&tree, &row(vec![]), &mut stores).unwrap_err();
        assert!(err.to_string().contains("required value is missing"));

        // Code is required inside each Language element
        let doc = row(vec![
            ("DocId", ParquetValue::Int64(1)),
            (
                "Name",
                list([record(vec![("Language", list([record(vec![("Country", ParquetValue::Int64(5))])]))])]),
            ),
        ]);
        assert!(matches!(
            shred(&tree, &doc, &mut stores),
            Err(ParquetError::DataMismatch(_))
        ));
    }

    #[test]
    fn rejected_rows_leave_stores_untouched() {
        let tree = ColumnTree::new(&dremel_schema()).unwrap();
        let mut stores = stores_for(&tree);
        let bad = row(vec![
            ("DocId", ParquetValue::Int64(1)),
            ("Links", record(vec![("Forward", list([ParquetValue::Int64(1), ParquetValue::string("x")]))])),
        ]);
        assert!(shred(&tree, &bad, &mut stores).is_err());
        assert!(stores.iter().all(|s| s.num_values() == 0));
    }

    #[test]
    fn shape_errors() {
        let tree = ColumnTree::new(&dremel_schema()).unwrap();
        let mut stores = stores_for(&tree);
        let cases = vec![
            row(vec![("DocId", ParquetValue::Int64(1)), ("Name", record(vec![]))]),
            row(vec![("DocId", ParquetValue::Int64(1)), ("Links", ParquetValue::Int64(3))]),
            row(vec![("DocId", ParquetValue::Int64(1)), ("Extra", ParquetValue::Int64(3))]),
            row(vec![
                ("DocId", ParquetValue::Int64(1)),
                ("Links", record(vec![("Forward", list([ParquetValue::Null]))])),
            ]),
        ];
        for case in cases {
            let err = shred(&tree, &case, &mut stores).unwrap_err();
            assert!(matches!(err, ParquetError::DataMismatch(_)), "{case:?}: {err}");
        }
    }

    #[test]
    fn projection_keeps_unselected_groups_empty() {
        let mut tree = ColumnTree::new(&dremel_schema()).unwrap();
        let mut stores = stores_for(&tree);
        for r in [dremel_document_1(), dremel_document_2()] {
            shred(&tree, &r, &mut stores).unwrap();
        }
        let columns = decoded(&tree, &stores);
        tree.project(&["Name.URL"]).unwrap();

        let mut assembler = RecordAssembler::new(&tree, columns, 2).unwrap();
        let first = assembler.next_record(&tree).unwrap().unwrap();
        let int = ParquetValue::Int64;
        assert_eq!(
            first,
            row(vec![
                ("Links", record(vec![])),
                (
                    "Name",
                    list([
                        record(vec![("Language", record(vec![])), ("URL", int(10))]),
                        record(vec![("Language", record(vec![])), ("URL", int(11))]),
                        record(vec![("Language", record(vec![]))]),
                    ])
                ),
            ])
        );
        let second = assembler.next_record(&tree).unwrap().unwrap();
        assert_eq!(second["Name"], list([record(vec![("Language", record(vec![])), ("URL", int(12))])]));
        assert!(assembler.next_record(&tree).unwrap().is_none());
    }

    #[test]
    fn truncated_column_is_a_format_error() {
        let schema = SchemaBuilder::new()
            .with_field(SchemaNode::primitive("a", Repetition::Optional, PhysicalType::Int32))
            .build()
            .unwrap();
        let tree = ColumnTree::new(&schema).unwrap();
        let mut data = ColumnData::new(&tree.leaves()[0]);
        data.push_page(vec![0], vec![1], vec![ParquetValue::Int32(4)])
            .unwrap();
        let mut assembler = RecordAssembler::new(&tree, vec![data], 2).unwrap();
        assert_eq!(
            assembler.next_record(&tree).unwrap(),
            Some(row(vec![("a", ParquetValue::Int32(4))]))
        );
        assert!(assembler.next_record(&tree).unwrap_err().is_format_error());
    }

    #[test]
    fn canonical_list_and_map_shapes() {
        let schema = SchemaBuilder::new()
            .with_field(SchemaNode::list(
                "tags",
                Repetition::Optional,
                SchemaNode::string("item", Repetition::Optional),
            ))
            .with_field(SchemaNode::map(
                "attrs",
                Repetition::Optional,
                SchemaNode::string("k", Repetition::Required),
                SchemaNode::primitive("v", Repetition::Optional, PhysicalType::Int32),
            ))
            .build()
            .unwrap();
        let tree = ColumnTree::new(&schema).unwrap();
        let rows = vec![
            row(vec![
                (
                    "tags",
                    record(vec![(
                        "list",
                        list([
                            record(vec![("element", ParquetValue::string("a"))]),
                            record(vec![]),
                            record(vec![("element", ParquetValue::string("b"))]),
                        ]),
                    )]),
                ),
                (
                    "attrs",
                    record(vec![(
                        "key_value",
                        list([record(vec![
                            ("key", ParquetValue::string("x")),
                            ("value", ParquetValue::Int32(1)),
                        ])]),
                    )]),
                ),
            ]),
            row(vec![("tags", record(vec![]))]),
        ];
        assert_eq!(round_trip(&tree, &rows), rows);
    }
}
