//! Dictionary store backing every buffered leaf column.

use ahash::AHashMap;

use crate::encoding::dictionary::index_bit_width;
use crate::ParquetValue;

/// Lookup key of a dictionary entry. Floats are keyed by their bit pattern
/// so `-0.0` and `0.0`, and NaNs with different payloads, stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DictKey {
    Float32(u32),
    Float64(u64),
    Value(ParquetValue),
}

impl DictKey {
    fn of(value: &ParquetValue) -> Self {
        match value {
            ParquetValue::Float32(f) => DictKey::Float32(f.to_bits()),
            ParquetValue::Float64(f) => DictKey::Float64(f.to_bits()),
            other => DictKey::Value(other.clone()),
        }
    }
}

/// Buffered values of one leaf column, stored as dictionary codes.
///
/// Every distinct non-null value gets a code in first-seen order; `data`
/// keeps one code per non-null value in write order so either the
/// dictionary or the plain form can be produced when the chunk is flushed.
#[derive(Debug, Default, Clone)]
pub struct DictStore {
    lookup: AHashMap<DictKey, u32>,
    values: Vec<ParquetValue>,
    data: Vec<u32>,
    null_count: usize,
    distinct_bytes: usize,
    plain_bytes: usize,
}

impl DictStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one value; `Null` only bumps the null count.
    pub fn add(&mut self, value: &ParquetValue) {
        if value.is_null() {
            self.null_count += 1;
            return;
        }
        let size = value.plain_size();
        self.plain_bytes += size;
        let key = DictKey::of(value);
        let code = match self.lookup.get(&key) {
            Some(&code) => code,
            None => {
                let code = self.values.len() as u32;
                self.lookup.insert(key, code);
                self.values.push(value.clone());
                self.distinct_bytes += size;
                code
            }
        };
        self.data.push(code);
    }

    /// Distinct values in code order.
    pub fn dictionary(&self) -> &[ParquetValue] {
        &self.values
    }

    /// One code per non-null value, in write order.
    pub fn codes(&self) -> &[u32] {
        &self.data
    }

    pub fn value(&self, index: usize) -> Option<&ParquetValue> {
        self.data.get(index).map(|&c| &self.values[c as usize])
    }

    /// Non-null values in write order for `range` of `codes()`.
    pub fn values_in(&self, range: std::ops::Range<usize>) -> Vec<ParquetValue> {
        self.data
            .get(range)
            .unwrap_or_default()
            .iter()
            .map(|&c| self.values[c as usize].clone())
            .collect()
    }

    /// Number of non-null values.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn distinct_count(&self) -> usize {
        self.values.len()
    }

    pub fn null_count(&self) -> usize {
        self.null_count
    }

    /// Estimated bytes of the plain form of every buffered value.
    pub fn plain_size(&self) -> usize {
        self.plain_bytes
    }

    /// Estimated bytes of the dictionary page plus the packed indices.
    pub fn dictionary_size(&self) -> usize {
        let width = index_bit_width(self.values.len()) as usize;
        self.distinct_bytes + (width * self.data.len()).div_ceil(8)
    }

    /// Whether the dictionary form is smaller than the plain form.
    pub fn prefers_dictionary(&self) -> bool {
        !self.data.is_empty() && self.dictionary_size() < self.plain_size()
    }

    pub fn reset(&mut self) {
        self.lookup.clear();
        self.values.clear();
        self.data.clear();
        self.null_count = 0;
        self.distinct_bytes = 0;
        self.plain_bytes = 0;
    }
}
