//! Buffered data of one leaf column.
//!
//! [`ColumnStore`] is the write side: it collects levels and values for the
//! row group being built, tracks statistics and decides where pages end.
//! [`ColumnData`] is the read side: the decoded levels and values of one
//! column chunk, in page order.

use std::cmp::Ordering;
use std::ops::Range;

use bytes::Bytes;
use ordered_float::OrderedFloat;
use tracing::trace;

use crate::basic::PhysicalType;
use crate::column::LeafDescriptor;
use crate::dict_store::DictStore;
use crate::encoding::bitutil::num_required_bits;
use crate::format;
use crate::packed_array::PackedArray;
use crate::{ParquetError, ParquetValue, Result};

/// Rejects values that cannot be stored in `leaf`.
pub fn check_value(leaf: &LeafDescriptor, value: &ParquetValue) -> Result<()> {
    let matches = match (leaf.physical_type, value) {
        (PhysicalType::Boolean, ParquetValue::Boolean(_))
        | (PhysicalType::Int32, ParquetValue::Int32(_))
        | (PhysicalType::Int64, ParquetValue::Int64(_))
        | (PhysicalType::Int96, ParquetValue::Int96(_))
        | (PhysicalType::Float, ParquetValue::Float32(_))
        | (PhysicalType::Double, ParquetValue::Float64(_))
        | (PhysicalType::ByteArray, ParquetValue::Bytes(_)) => true,
        (PhysicalType::FixedLenByteArray, ParquetValue::Bytes(b)) => {
            if b.len() != leaf.type_length {
                return Err(ParquetError::data_mismatch(format!(
                    "column '{}' holds {} byte values, got {} bytes",
                    leaf.dotted_path(),
                    leaf.type_length,
                    b.len()
                )));
            }
            true
        }
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(ParquetError::data_mismatch(format!(
            "cannot store {} value in {} column '{}'",
            value.type_name(),
            leaf.physical_type,
            leaf.dotted_path()
        )))
    }
}

/// Slots of one completed page within a [`ColumnStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBounds {
    /// Range of level entries.
    pub levels: Range<usize>,
    /// Range of non-null values.
    pub values: Range<usize>,
    pub num_rows: usize,
}

impl PageBounds {
    pub fn num_values(&self) -> usize {
        self.levels.len()
    }

    pub fn null_count(&self) -> usize {
        self.levels.len() - self.values.len()
    }
}

/// Min/max and null count of a column chunk.
///
/// Integers compare signed, floats by IEEE order with NaN skipped, byte
/// arrays unsigned lexicographically and booleans false before true.
/// INT96 columns carry no min/max.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStatistics {
    pub min: Option<ParquetValue>,
    pub max: Option<ParquetValue>,
    pub null_count: u64,
    pub distinct_count: Option<u64>,
}

impl ColumnStatistics {
    pub fn update(&mut self, value: &ParquetValue) {
        if value.is_null() {
            self.null_count += 1;
            return;
        }
        if !has_order(value) {
            return;
        }
        if self
            .min
            .as_ref()
            .is_none_or(|m| compare(value, m) == Some(Ordering::Less))
        {
            self.min = Some(value.clone());
        }
        if self
            .max
            .as_ref()
            .is_none_or(|m| compare(value, m) == Some(Ordering::Greater))
        {
            self.max = Some(value.clone());
        }
    }

    pub fn to_thrift(&self) -> format::Statistics {
        format::Statistics {
            min_value: self.min.as_ref().map(stat_bytes),
            max_value: self.max.as_ref().map(stat_bytes),
            null_count: Some(self.null_count as i64),
            distinct_count: self.distinct_count.map(|d| d as i64),
            ..Default::default()
        }
    }

    /// Reads footer statistics, preferring `min_value`/`max_value` over the
    /// deprecated `min`/`max` fields.
    pub fn from_thrift(stats: &format::Statistics, physical_type: PhysicalType) -> Result<Self> {
        let decode = |b: &Option<Vec<u8>>| -> Result<Option<ParquetValue>> {
            b.as_deref()
                .map(|b| stat_value(physical_type, b))
                .transpose()
        };
        let min = match &stats.min_value {
            Some(_) => decode(&stats.min_value)?,
            None => decode(&stats.min)?,
        };
        let max = match &stats.max_value {
            Some(_) => decode(&stats.max_value)?,
            None => decode(&stats.max)?,
        };
        Ok(ColumnStatistics {
            min,
            max,
            null_count: stats.null_count.unwrap_or(0).max(0) as u64,
            distinct_count: stats.distinct_count.map(|d| d.max(0) as u64),
        })
    }
}

fn has_order(value: &ParquetValue) -> bool {
    match value {
        ParquetValue::Float32(f) => !f.0.is_nan(),
        ParquetValue::Float64(f) => !f.0.is_nan(),
        ParquetValue::Int96(_) => false,
        other => other.is_primitive(),
    }
}

fn compare(a: &ParquetValue, b: &ParquetValue) -> Option<Ordering> {
    match (a, b) {
        (ParquetValue::Boolean(a), ParquetValue::Boolean(b)) => Some(a.cmp(b)),
        (ParquetValue::Int32(a), ParquetValue::Int32(b)) => Some(a.cmp(b)),
        (ParquetValue::Int64(a), ParquetValue::Int64(b)) => Some(a.cmp(b)),
        (ParquetValue::Float32(a), ParquetValue::Float32(b)) => a.0.partial_cmp(&b.0),
        (ParquetValue::Float64(a), ParquetValue::Float64(b)) => a.0.partial_cmp(&b.0),
        (ParquetValue::Bytes(a), ParquetValue::Bytes(b)) => Some(a.as_ref().cmp(b.as_ref())),
        _ => None,
    }
}

/// Statistics form of a value: plain bytes, without a length prefix for
/// byte arrays.
fn stat_bytes(value: &ParquetValue) -> Vec<u8> {
    match value {
        ParquetValue::Boolean(b) => vec![*b as u8],
        ParquetValue::Int32(i) => i.to_le_bytes().to_vec(),
        ParquetValue::Int64(i) => i.to_le_bytes().to_vec(),
        ParquetValue::Int96(words) => words.iter().flat_map(|w| w.to_le_bytes()).collect(),
        ParquetValue::Float32(f) => f.0.to_le_bytes().to_vec(),
        ParquetValue::Float64(f) => f.0.to_le_bytes().to_vec(),
        ParquetValue::Bytes(b) => b.to_vec(),
        ParquetValue::List(_) | ParquetValue::Record(_) | ParquetValue::Null => Vec::new(),
    }
}

fn stat_value(physical_type: PhysicalType, bytes: &[u8]) -> Result<ParquetValue> {
    fn fixed<const N: usize>(physical_type: PhysicalType, bytes: &[u8]) -> Result<[u8; N]> {
        bytes.try_into().map_err(|_| {
            ParquetError::format(format!(
                "{} statistics value has {} bytes",
                physical_type,
                bytes.len()
            ))
        })
    }
    Ok(match physical_type {
        PhysicalType::Boolean => ParquetValue::Boolean(fixed::<1>(physical_type, bytes)?[0] != 0),
        PhysicalType::Int32 => ParquetValue::Int32(i32::from_le_bytes(fixed(physical_type, bytes)?)),
        PhysicalType::Int64 => ParquetValue::Int64(i64::from_le_bytes(fixed(physical_type, bytes)?)),
        PhysicalType::Int96 => {
            let raw: [u8; 12] = fixed(physical_type, bytes)?;
            let mut words = [0u32; 3];
            for (word, chunk) in words.iter_mut().zip(raw.chunks_exact(4)) {
                *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
            ParquetValue::Int96(words)
        }
        PhysicalType::Float => {
            ParquetValue::Float32(OrderedFloat(f32::from_le_bytes(fixed(physical_type, bytes)?)))
        }
        PhysicalType::Double => {
            ParquetValue::Float64(OrderedFloat(f64::from_le_bytes(fixed(physical_type, bytes)?)))
        }
        PhysicalType::ByteArray | PhysicalType::FixedLenByteArray => {
            ParquetValue::Bytes(Bytes::copy_from_slice(bytes))
        }
    })
}

/// Write-side buffer of one leaf column for the row group being built.
#[derive(Debug, Clone)]
pub struct ColumnStore {
    descriptor: LeafDescriptor,
    rep_levels: PackedArray,
    def_levels: PackedArray,
    values: DictStore,
    statistics: ColumnStatistics,
    pages: Vec<PageBounds>,
    /// Start of the page in progress.
    page_levels: usize,
    page_values: usize,
    page_rows: usize,
    /// Estimated uncompressed bytes of the page in progress.
    page_bytes: usize,
    num_rows: usize,
}

impl ColumnStore {
    pub fn new(descriptor: LeafDescriptor) -> Result<Self> {
        let rep_levels = PackedArray::new(num_required_bits(descriptor.max_rep_level as u64))?;
        let def_levels = PackedArray::new(num_required_bits(descriptor.max_def_level as u64))?;
        Ok(ColumnStore {
            descriptor,
            rep_levels,
            def_levels,
            values: DictStore::new(),
            statistics: ColumnStatistics::default(),
            pages: Vec::new(),
            page_levels: 0,
            page_values: 0,
            page_rows: 0,
            page_bytes: 0,
            num_rows: 0,
        })
    }

    pub fn descriptor(&self) -> &LeafDescriptor {
        &self.descriptor
    }

    /// Appends one slot. `value` must be `Null` exactly when `def_level` is
    /// below the column's maximum.
    pub fn push(&mut self, value: &ParquetValue, rep_level: u8, def_level: u8) -> Result<()> {
        let max_def = self.descriptor.max_def_level;
        if rep_level > self.descriptor.max_rep_level || def_level > max_def {
            return Err(ParquetError::internal(format!(
                "levels ({}, {}) out of range for column '{}'",
                rep_level,
                def_level,
                self.descriptor.dotted_path()
            )));
        }
        if value.is_null() != (def_level < max_def) {
            return Err(ParquetError::internal(format!(
                "definition level {} does not agree with {} value in column '{}'",
                def_level,
                value.type_name(),
                self.descriptor.dotted_path()
            )));
        }
        if !value.is_null() {
            check_value(&self.descriptor, value)?;
        }

        self.rep_levels.append(rep_level as u32)?;
        self.def_levels.append(def_level as u32)?;
        if rep_level == 0 {
            self.num_rows += 1;
            self.page_rows += 1;
        }
        self.values.add(value);
        self.statistics.update(value);
        self.page_bytes += value.plain_size() + 1;
        Ok(())
    }

    /// Called after each complete record; closes the page in progress once
    /// it reaches `max_page_size`, so every page starts a record.
    pub fn end_record(&mut self, max_page_size: usize) {
        if self.page_bytes >= max_page_size {
            trace!(
                column = %self.descriptor.dotted_path(),
                bytes = self.page_bytes,
                rows = self.page_rows,
                "page split"
            );
            self.close_page();
        }
    }

    fn close_page(&mut self) {
        let levels = self.rep_levels.len();
        if levels == self.page_levels {
            return;
        }
        self.pages.push(PageBounds {
            levels: self.page_levels..levels,
            values: self.page_values..self.values.len(),
            num_rows: self.page_rows,
        });
        self.page_levels = levels;
        self.page_values = self.values.len();
        self.page_rows = 0;
        self.page_bytes = 0;
    }

    /// Closes the page in progress and returns every page of the chunk.
    pub fn finish_pages(&mut self) -> &[PageBounds] {
        self.close_page();
        &self.pages
    }

    pub fn rep_levels(&self) -> &PackedArray {
        &self.rep_levels
    }

    pub fn def_levels(&self) -> &PackedArray {
        &self.def_levels
    }

    pub fn values(&self) -> &DictStore {
        &self.values
    }

    pub fn statistics(&self) -> &ColumnStatistics {
        &self.statistics
    }

    /// Level entries, nulls included.
    pub fn num_values(&self) -> usize {
        self.def_levels.len()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn null_count(&self) -> usize {
        self.values.null_count()
    }

    /// Whether the chunk should be written with a dictionary.
    pub fn prefers_dictionary(&self) -> bool {
        self.descriptor.physical_type != PhysicalType::Boolean && self.values.prefers_dictionary()
    }

    /// Estimated buffered bytes, used by the row group flush policy.
    pub fn estimated_size(&self) -> usize {
        self.rep_levels.byte_size()
            + self.def_levels.byte_size()
            + self.values.plain_size().min(self.values.dictionary_size())
    }

    /// Drops everything buffered, done after the chunk is written.
    pub fn reset(&mut self) {
        self.rep_levels.reset();
        self.def_levels.reset();
        self.values.reset();
        self.statistics = ColumnStatistics::default();
        self.pages.clear();
        self.page_levels = 0;
        self.page_values = 0;
        self.page_rows = 0;
        self.page_bytes = 0;
        self.num_rows = 0;
    }
}

/// Decoded levels and values of one column chunk.
#[derive(Debug, Clone)]
pub struct ColumnData {
    max_def_level: u8,
    rep_levels: Vec<u8>,
    def_levels: Vec<u8>,
    values: Vec<ParquetValue>,
}

impl ColumnData {
    pub fn new(leaf: &LeafDescriptor) -> Self {
        ColumnData {
            max_def_level: leaf.max_def_level,
            rep_levels: Vec::new(),
            def_levels: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Appends one decoded page. The number of fully defined levels must
    /// equal the number of values.
    pub fn push_page(
        &mut self,
        rep_levels: Vec<u8>,
        def_levels: Vec<u8>,
        values: Vec<ParquetValue>,
    ) -> Result<()> {
        if rep_levels.len() != def_levels.len() {
            return Err(ParquetError::format(format!(
                "page has {} repetition levels and {} definition levels",
                rep_levels.len(),
                def_levels.len()
            )));
        }
        let defined = def_levels.iter().filter(|&&d| d == self.max_def_level).count();
        if defined != values.len() {
            return Err(ParquetError::format(format!(
                "page defines {} values but holds {}",
                defined,
                values.len()
            )));
        }
        self.rep_levels.extend(rep_levels);
        self.def_levels.extend(def_levels);
        self.values.extend(values);
        Ok(())
    }

    pub fn rep_levels(&self) -> &[u8] {
        &self.rep_levels
    }

    pub fn def_levels(&self) -> &[u8] {
        &self.def_levels
    }

    pub fn values(&self) -> &[ParquetValue] {
        &self.values
    }

    /// Level entries, nulls included.
    pub fn len(&self) -> usize {
        self.def_levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.def_levels.is_empty()
    }

    /// Records in the chunk: entries starting at repetition level 0.
    pub fn num_rows(&self) -> usize {
        self.rep_levels.iter().filter(|&&r| r == 0).count()
    }

    /// Approximate heap bytes, reserved against the reader's budget.
    pub fn byte_size(&self) -> usize {
        self.rep_levels.len()
            + self.def_levels.len()
            + self.values.iter().map(ParquetValue::plain_size).sum::<usize>()
    }
}
