use bytes::Bytes;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// One record as exchanged with the writer and reader: field name to value,
/// in schema order when produced by the reader.
pub type Row = IndexMap<Arc<str>, ParquetValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParquetValue {
    // Primitive types, one per physical type
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Int96([u32; 3]),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),
    // BYTE_ARRAY and FIXED_LEN_BYTE_ARRAY
    Bytes(Bytes),

    // Complex types
    List(Vec<ParquetValue>),
    Record(Row), // Group node, preserves field order

    // Null value
    Null,
}

impl std::hash::Hash for ParquetValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ParquetValue::Boolean(b) => b.hash(state),
            ParquetValue::Int32(i) => i.hash(state),
            ParquetValue::Int64(i) => i.hash(state),
            ParquetValue::Int96(i) => i.hash(state),
            ParquetValue::Float32(f) => f.hash(state),
            ParquetValue::Float64(f) => f.hash(state),
            ParquetValue::Bytes(b) => b.hash(state),
            ParquetValue::List(l) => l.hash(state),
            ParquetValue::Record(r) => {
                // Order-insensitive, to agree with IndexMap equality
                r.len().hash(state);
                let mut keys: Vec<&Arc<str>> = r.keys().collect();
                keys.sort();
                for k in keys {
                    k.hash(state);
                    r[k].hash(state);
                }
            }
            ParquetValue::Null => 0_i32.hash(state),
        }
    }
}

impl ParquetValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, ParquetValue::Null)
    }

    /// Whether this is a leaf value that can be stored in a column.
    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            ParquetValue::List(_) | ParquetValue::Record(_) | ParquetValue::Null
        )
    }

    /// Get the type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            ParquetValue::Boolean(_) => "Boolean",
            ParquetValue::Int32(_) => "Int32",
            ParquetValue::Int64(_) => "Int64",
            ParquetValue::Int96(_) => "Int96",
            ParquetValue::Float32(_) => "Float32",
            ParquetValue::Float64(_) => "Float64",
            ParquetValue::Bytes(_) => "Bytes",
            ParquetValue::List(_) => "List",
            ParquetValue::Record(_) => "Record",
            ParquetValue::Null => "Null",
        }
    }

    /// Size of the value in PLAIN encoding, used by the size heuristics.
    pub fn plain_size(&self) -> usize {
        match self {
            ParquetValue::Boolean(_) => 1,
            ParquetValue::Int32(_) | ParquetValue::Float32(_) => 4,
            ParquetValue::Int64(_) | ParquetValue::Float64(_) => 8,
            ParquetValue::Int96(_) => 12,
            ParquetValue::Bytes(b) => 4 + b.len(),
            ParquetValue::List(items) => items.iter().map(ParquetValue::plain_size).sum(),
            ParquetValue::Record(fields) => fields.values().map(ParquetValue::plain_size).sum(),
            ParquetValue::Null => 0,
        }
    }

    /// Convenience constructor for UTF-8 byte arrays.
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        ParquetValue::Bytes(Bytes::copy_from_slice(s.as_ref().as_bytes()))
    }

    pub fn as_record(&self) -> Option<&Row> {
        match self {
            ParquetValue::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParquetValue]> {
        match self {
            ParquetValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl From<bool> for ParquetValue {
    fn from(v: bool) -> Self {
        ParquetValue::Boolean(v)
    }
}

impl From<i32> for ParquetValue {
    fn from(v: i32) -> Self {
        ParquetValue::Int32(v)
    }
}

impl From<i64> for ParquetValue {
    fn from(v: i64) -> Self {
        ParquetValue::Int64(v)
    }
}

impl From<f32> for ParquetValue {
    fn from(v: f32) -> Self {
        ParquetValue::Float32(OrderedFloat(v))
    }
}

impl From<f64> for ParquetValue {
    fn from(v: f64) -> Self {
        ParquetValue::Float64(OrderedFloat(v))
    }
}

impl From<Bytes> for ParquetValue {
    fn from(v: Bytes) -> Self {
        ParquetValue::Bytes(v)
    }
}

impl From<Row> for ParquetValue {
    fn from(v: Row) -> Self {
        ParquetValue::Record(v)
    }
}

impl From<Vec<ParquetValue>> for ParquetValue {
    fn from(v: Vec<ParquetValue>) -> Self {
        ParquetValue::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_creation() {
        let v = ParquetValue::Int32(42);
        assert_eq!(v, ParquetValue::Int32(42));
        assert!(!v.is_null());
        assert!(v.is_primitive());
        assert_eq!(v.type_name(), "Int32");
    }

    #[test]
    fn test_null_value() {
        let v = ParquetValue::Null;
        assert!(v.is_null());
        assert!(!v.is_primitive());
        assert_eq!(v.type_name(), "Null");
    }

    #[test]
    fn test_float_equality() {
        let v1 = ParquetValue::from(3.5f32);
        let v2 = ParquetValue::Float32(OrderedFloat(3.5));
        assert_eq!(v1, v2);
        let nan = ParquetValue::from(f64::NAN);
        assert_eq!(nan.clone(), nan);
    }

    #[test]
    fn test_plain_size() {
        assert_eq!(ParquetValue::Int96([1, 2, 3]).plain_size(), 12);
        assert_eq!(ParquetValue::string("abc").plain_size(), 7);
        assert_eq!(ParquetValue::Null.plain_size(), 0);
    }

    #[test]
    fn test_record_equality_ignores_order() {
        let mut a = Row::new();
        a.insert(Arc::from("x"), ParquetValue::Int32(1));
        a.insert(Arc::from("y"), ParquetValue::Int32(2));
        let mut b = Row::new();
        b.insert(Arc::from("y"), ParquetValue::Int32(2));
        b.insert(Arc::from("x"), ParquetValue::Int32(1));
        assert_eq!(ParquetValue::Record(a), ParquetValue::Record(b));
    }

    #[test]
    fn test_hash_consistency() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(ParquetValue::Int32(42));
        set.insert(ParquetValue::string("hello"));

        assert!(set.contains(&ParquetValue::Int32(42)));
        assert!(set.contains(&ParquetValue::string("hello")));
        assert!(!set.contains(&ParquetValue::Int32(43)));
    }
}
