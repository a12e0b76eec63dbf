//! Enumerations shared by the schema, the footer records and the page codecs.
//!
//! Every enum maps to the integer identifier used on disk through
//! `TryFrom<i32>` (rejecting unknown identifiers as format errors) and
//! `as_i32`.

use crate::{ParquetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// The identifier written to disk.
            pub fn as_i32(self) -> i32 {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = ParquetError;

            fn try_from(value: i32) -> Result<Self> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(ParquetError::format(format!(
                        "unknown {} identifier {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

wire_enum!(
    /// Physical storage type of a leaf column
    PhysicalType {
        Boolean = 0,
        Int32 = 1,
        Int64 = 2,
        Int96 = 3,
        Float = 4,
        Double = 5,
        ByteArray = 6,
        FixedLenByteArray = 7,
    }
);

wire_enum!(
    /// Represents how values are repeated in Parquet
    Repetition {
        Required = 0,
        Optional = 1,
        Repeated = 2,
    }
);

wire_enum!(
    /// Page type found in a page header
    PageType {
        DataPage = 0,
        IndexPage = 1,
        DictionaryPage = 2,
        DataPageV2 = 3,
    }
);

wire_enum!(
    /// Legacy type annotation of a schema element
    ConvertedType {
        Utf8 = 0,
        Map = 1,
        MapKeyValue = 2,
        List = 3,
        Enum = 4,
        Decimal = 5,
        Date = 6,
        TimeMillis = 7,
        TimeMicros = 8,
        TimestampMillis = 9,
        TimestampMicros = 10,
        Uint8 = 11,
        Uint16 = 12,
        Uint32 = 13,
        Uint64 = 14,
        Int8 = 15,
        Int16 = 16,
        Int32 = 17,
        Int64 = 18,
        Json = 19,
        Bson = 20,
        Interval = 21,
    }
);

/// Encoding of a level or value stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Encoding {
    Plain,
    /// Deprecated alias of `RleDictionary`, accepted on read only
    PlainDictionary,
    Rle,
    BitPacked,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
    DeltaByteArray,
    RleDictionary,
}

impl Encoding {
    pub fn as_i32(self) -> i32 {
        match self {
            Encoding::Plain => 0,
            Encoding::PlainDictionary => 2,
            Encoding::Rle => 3,
            Encoding::BitPacked => 4,
            Encoding::DeltaBinaryPacked => 5,
            Encoding::DeltaLengthByteArray => 6,
            Encoding::DeltaByteArray => 7,
            Encoding::RleDictionary => 8,
        }
    }

    /// Whether data pages with this encoding carry dictionary indices.
    pub fn is_dictionary(self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }
}

impl TryFrom<i32> for Encoding {
    type Error = ParquetError;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Encoding::Plain,
            2 => Encoding::PlainDictionary,
            3 => Encoding::Rle,
            4 => Encoding::BitPacked,
            5 => Encoding::DeltaBinaryPacked,
            6 => Encoding::DeltaLengthByteArray,
            7 => Encoding::DeltaByteArray,
            8 => Encoding::RleDictionary,
            9 => return Err(ParquetError::unsupported("BYTE_STREAM_SPLIT encoding")),
            other => {
                return Err(ParquetError::format(format!(
                    "unknown Encoding identifier {}",
                    other
                )))
            }
        })
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Block compression codec identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Compression {
    Uncompressed,
    Snappy,
    Gzip,
    Lzo,
    Brotli,
    Lz4,
    Zstd,
    Lz4Raw,
}

impl Compression {
    pub fn as_i32(self) -> i32 {
        match self {
            Compression::Uncompressed => 0,
            Compression::Snappy => 1,
            Compression::Gzip => 2,
            Compression::Lzo => 3,
            Compression::Brotli => 4,
            Compression::Lz4 => 5,
            Compression::Zstd => 6,
            Compression::Lz4Raw => 7,
        }
    }
}

impl TryFrom<i32> for Compression {
    type Error = ParquetError;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Compression::Uncompressed,
            1 => Compression::Snappy,
            2 => Compression::Gzip,
            3 => Compression::Lzo,
            4 => Compression::Brotli,
            5 => Compression::Lz4,
            6 => Compression::Zstd,
            7 => Compression::Lz4Raw,
            other => {
                return Err(ParquetError::format(format!(
                    "unknown Compression identifier {}",
                    other
                )))
            }
        })
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Unit of TIME and TIMESTAMP logical types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millis,
    Micros,
    Nanos,
}

/// Logical type annotation of a schema element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    String,
    Map,
    List,
    Enum,
    Decimal { scale: i32, precision: i32 },
    Date,
    Time { is_adjusted_to_utc: bool, unit: TimeUnit },
    Timestamp { is_adjusted_to_utc: bool, unit: TimeUnit },
    Integer { bit_width: i8, is_signed: bool },
    Unknown,
    Json,
    Bson,
    Uuid,
}

/// Version of the data page layout produced by the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataPageVersion {
    #[default]
    V1,
    V2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_identifiers() {
        assert_eq!(PhysicalType::FixedLenByteArray.as_i32(), 7);
        assert_eq!(PhysicalType::try_from(3).unwrap(), PhysicalType::Int96);
        assert_eq!(Repetition::try_from(2).unwrap(), Repetition::Repeated);
        assert_eq!(ConvertedType::try_from(17).unwrap(), ConvertedType::Int32);
        assert_eq!(Encoding::RleDictionary.as_i32(), 8);
        assert_eq!(Compression::try_from(6).unwrap(), Compression::Zstd);
    }

    #[test]
    fn test_unknown_identifiers_are_format_errors() {
        assert!(PhysicalType::try_from(8).unwrap_err().is_format_error());
        assert!(PageType::try_from(-1).unwrap_err().is_format_error());
        assert!(Compression::try_from(42).unwrap_err().is_format_error());
        assert!(matches!(
            Encoding::try_from(9),
            Err(ParquetError::Unsupported(_))
        ));
    }

    #[test]
    fn test_dictionary_alias() {
        assert!(Encoding::PlainDictionary.is_dictionary());
        assert!(Encoding::RleDictionary.is_dictionary());
        assert!(!Encoding::Plain.is_dictionary());
    }
}
