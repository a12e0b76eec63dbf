//! Footer and page header records, serialized with the thrift compact
//! protocol.
//!
//! Only the fields this crate reads or writes are modelled; unknown fields
//! are skipped on read so files from newer writers still open.

use thrift::protocol::{
    field_id, TCompactInputProtocol, TCompactOutputProtocol, TFieldIdentifier, TInputProtocol,
    TListIdentifier, TOutputProtocol, TStructIdentifier, TType,
};

use crate::basic::{
    Compression, ConvertedType, Encoding, LogicalType, PageType, PhysicalType, Repetition,
    TimeUnit,
};
use crate::{ParquetError, Result};

/// A record that can be read from and written to a thrift protocol.
pub trait ThriftRecord: Sized {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self>;
    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()>;
}

/// Decodes one record from the front of `data`, returning it together with
/// the number of bytes it occupied.
pub fn read_record<T: ThriftRecord>(data: &[u8]) -> Result<(T, usize)> {
    let mut cursor = data;
    let record = {
        let mut prot = TCompactInputProtocol::new(&mut cursor);
        T::read_from(&mut prot)?
    };
    Ok((record, data.len() - cursor.len()))
}

/// Appends the compact encoding of `record` to `out`.
pub fn write_record<T: ThriftRecord>(record: &T, out: &mut Vec<u8>) -> Result<()> {
    let mut prot = TCompactOutputProtocol::new(out);
    record.write_to(&mut prot)?;
    prot.flush()?;
    Ok(())
}

fn missing(record: &str, field: &str) -> ParquetError {
    ParquetError::format(format!("{}.{} is missing", record, field))
}

fn required<T>(value: Option<T>, record: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| missing(record, field))
}

fn read_list<T, F>(prot: &mut dyn TInputProtocol, mut read_item: F) -> Result<Vec<T>>
where
    F: FnMut(&mut dyn TInputProtocol) -> Result<T>,
{
    let ident = prot.read_list_begin()?;
    if ident.size < 0 {
        return Err(ParquetError::format(format!(
            "negative list size {}",
            ident.size
        )));
    }
    let mut items = Vec::with_capacity((ident.size as usize).min(1 << 16));
    for _ in 0..ident.size {
        items.push(read_item(prot)?);
    }
    prot.read_list_end()?;
    Ok(items)
}

/// Reads an empty marker struct such as the members of a union.
fn read_empty(prot: &mut dyn TInputProtocol) -> Result<()> {
    prot.skip(TType::Struct)?;
    Ok(())
}

fn write_empty(prot: &mut dyn TOutputProtocol, name: &str) -> Result<()> {
    prot.write_struct_begin(&TStructIdentifier::new(name))?;
    prot.write_field_stop()?;
    prot.write_struct_end()?;
    Ok(())
}

fn write_i32(prot: &mut dyn TOutputProtocol, name: &str, id: i16, v: i32) -> Result<()> {
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::I32, id))?;
    prot.write_i32(v)?;
    prot.write_field_end()?;
    Ok(())
}

fn write_i64(prot: &mut dyn TOutputProtocol, name: &str, id: i16, v: i64) -> Result<()> {
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::I64, id))?;
    prot.write_i64(v)?;
    prot.write_field_end()?;
    Ok(())
}

fn write_bool(prot: &mut dyn TOutputProtocol, name: &str, id: i16, v: bool) -> Result<()> {
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::Bool, id))?;
    prot.write_bool(v)?;
    prot.write_field_end()?;
    Ok(())
}

fn write_string(prot: &mut dyn TOutputProtocol, name: &str, id: i16, v: &str) -> Result<()> {
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::String, id))?;
    prot.write_string(v)?;
    prot.write_field_end()?;
    Ok(())
}

fn write_binary(prot: &mut dyn TOutputProtocol, name: &str, id: i16, v: &[u8]) -> Result<()> {
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::String, id))?;
    prot.write_bytes(v)?;
    prot.write_field_end()?;
    Ok(())
}

fn write_struct<T: ThriftRecord>(
    prot: &mut dyn TOutputProtocol,
    name: &str,
    id: i16,
    v: &T,
) -> Result<()> {
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::Struct, id))?;
    v.write_to(prot)?;
    prot.write_field_end()?;
    Ok(())
}

fn write_struct_list<T: ThriftRecord>(
    prot: &mut dyn TOutputProtocol,
    name: &str,
    id: i16,
    items: &[T],
) -> Result<()> {
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::List, id))?;
    prot.write_list_begin(&TListIdentifier::new(TType::Struct, items.len() as i32))?;
    for item in items {
        item.write_to(prot)?;
    }
    prot.write_list_end()?;
    prot.write_field_end()?;
    Ok(())
}

/// Column chunk or page statistics. `min_value`/`max_value` hold the plain
/// encoding of the extreme values; the legacy `min`/`max` fields are read
/// but never written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub max: Option<Vec<u8>>,
    pub min: Option<Vec<u8>>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub max_value: Option<Vec<u8>>,
    pub min_value: Option<Vec<u8>>,
}

impl ThriftRecord for Statistics {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut stats = Statistics::default();
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => stats.max = Some(prot.read_bytes()?),
                2 => stats.min = Some(prot.read_bytes()?),
                3 => stats.null_count = Some(prot.read_i64()?),
                4 => stats.distinct_count = Some(prot.read_i64()?),
                5 => stats.max_value = Some(prot.read_bytes()?),
                6 => stats.min_value = Some(prot.read_bytes()?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        Ok(stats)
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("Statistics"))?;
        if let Some(v) = &self.max {
            write_binary(prot, "max", 1, v)?;
        }
        if let Some(v) = &self.min {
            write_binary(prot, "min", 2, v)?;
        }
        if let Some(v) = self.null_count {
            write_i64(prot, "null_count", 3, v)?;
        }
        if let Some(v) = self.distinct_count {
            write_i64(prot, "distinct_count", 4, v)?;
        }
        if let Some(v) = &self.max_value {
            write_binary(prot, "max_value", 5, v)?;
        }
        if let Some(v) = &self.min_value {
            write_binary(prot, "min_value", 6, v)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

fn read_time_unit(prot: &mut dyn TInputProtocol) -> Result<TimeUnit> {
    let mut unit = None;
    prot.read_struct_begin()?;
    loop {
        let ident = prot.read_field_begin()?;
        if ident.field_type == TType::Stop {
            break;
        }
        match field_id(&ident)? {
            1 => {
                read_empty(prot)?;
                unit = Some(TimeUnit::Millis);
            }
            2 => {
                read_empty(prot)?;
                unit = Some(TimeUnit::Micros);
            }
            3 => {
                read_empty(prot)?;
                unit = Some(TimeUnit::Nanos);
            }
            _ => prot.skip(ident.field_type)?,
        }
        prot.read_field_end()?;
    }
    prot.read_struct_end()?;
    required(unit, "TimeUnit", "unit")
}

fn write_time_unit(prot: &mut dyn TOutputProtocol, unit: TimeUnit) -> Result<()> {
    let (name, id) = match unit {
        TimeUnit::Millis => ("MILLIS", 1),
        TimeUnit::Micros => ("MICROS", 2),
        TimeUnit::Nanos => ("NANOS", 3),
    };
    prot.write_struct_begin(&TStructIdentifier::new("TimeUnit"))?;
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::Struct, id))?;
    write_empty(prot, name)?;
    prot.write_field_end()?;
    prot.write_field_stop()?;
    prot.write_struct_end()?;
    Ok(())
}

/// Reads the `{isAdjustedToUTC, unit}` body shared by TIME and TIMESTAMP.
fn read_temporal(prot: &mut dyn TInputProtocol, record: &str) -> Result<(bool, TimeUnit)> {
    let mut adjusted = None;
    let mut unit = None;
    prot.read_struct_begin()?;
    loop {
        let ident = prot.read_field_begin()?;
        if ident.field_type == TType::Stop {
            break;
        }
        match field_id(&ident)? {
            1 => adjusted = Some(prot.read_bool()?),
            2 => unit = Some(read_time_unit(prot)?),
            _ => prot.skip(ident.field_type)?,
        }
        prot.read_field_end()?;
    }
    prot.read_struct_end()?;
    Ok((
        required(adjusted, record, "isAdjustedToUTC")?,
        required(unit, record, "unit")?,
    ))
}

impl ThriftRecord for LogicalType {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut logical = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            let parsed = match field_id(&ident)? {
                1 => Some(read_empty(prot).map(|_| LogicalType::String)?),
                2 => Some(read_empty(prot).map(|_| LogicalType::Map)?),
                3 => Some(read_empty(prot).map(|_| LogicalType::List)?),
                4 => Some(read_empty(prot).map(|_| LogicalType::Enum)?),
                5 => {
                    let mut scale = None;
                    let mut precision = None;
                    prot.read_struct_begin()?;
                    loop {
                        let inner = prot.read_field_begin()?;
                        if inner.field_type == TType::Stop {
                            break;
                        }
                        match field_id(&inner)? {
                            1 => scale = Some(prot.read_i32()?),
                            2 => precision = Some(prot.read_i32()?),
                            _ => prot.skip(inner.field_type)?,
                        }
                        prot.read_field_end()?;
                    }
                    prot.read_struct_end()?;
                    Some(LogicalType::Decimal {
                        scale: required(scale, "DecimalType", "scale")?,
                        precision: required(precision, "DecimalType", "precision")?,
                    })
                }
                6 => Some(read_empty(prot).map(|_| LogicalType::Date)?),
                7 => {
                    let (is_adjusted_to_utc, unit) = read_temporal(prot, "TimeType")?;
                    Some(LogicalType::Time {
                        is_adjusted_to_utc,
                        unit,
                    })
                }
                8 => {
                    let (is_adjusted_to_utc, unit) = read_temporal(prot, "TimestampType")?;
                    Some(LogicalType::Timestamp {
                        is_adjusted_to_utc,
                        unit,
                    })
                }
                10 => {
                    let mut bit_width = None;
                    let mut is_signed = None;
                    prot.read_struct_begin()?;
                    loop {
                        let inner = prot.read_field_begin()?;
                        if inner.field_type == TType::Stop {
                            break;
                        }
                        match field_id(&inner)? {
                            1 => bit_width = Some(prot.read_i8()?),
                            2 => is_signed = Some(prot.read_bool()?),
                            _ => prot.skip(inner.field_type)?,
                        }
                        prot.read_field_end()?;
                    }
                    prot.read_struct_end()?;
                    Some(LogicalType::Integer {
                        bit_width: required(bit_width, "IntType", "bitWidth")?,
                        is_signed: required(is_signed, "IntType", "isSigned")?,
                    })
                }
                11 => Some(read_empty(prot).map(|_| LogicalType::Unknown)?),
                12 => Some(read_empty(prot).map(|_| LogicalType::Json)?),
                13 => Some(read_empty(prot).map(|_| LogicalType::Bson)?),
                14 => Some(read_empty(prot).map(|_| LogicalType::Uuid)?),
                _ => {
                    prot.skip(ident.field_type)?;
                    None
                }
            };
            if parsed.is_some() {
                logical = parsed;
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        // Members this crate does not model read as Unknown.
        Ok(logical.unwrap_or(LogicalType::Unknown))
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("LogicalType"))?;
        match *self {
            LogicalType::String => write_union_marker(prot, "STRING", 1)?,
            LogicalType::Map => write_union_marker(prot, "MAP", 2)?,
            LogicalType::List => write_union_marker(prot, "LIST", 3)?,
            LogicalType::Enum => write_union_marker(prot, "ENUM", 4)?,
            LogicalType::Decimal { scale, precision } => {
                prot.write_field_begin(&TFieldIdentifier::new("DECIMAL", TType::Struct, 5))?;
                prot.write_struct_begin(&TStructIdentifier::new("DecimalType"))?;
                write_i32(prot, "scale", 1, scale)?;
                write_i32(prot, "precision", 2, precision)?;
                prot.write_field_stop()?;
                prot.write_struct_end()?;
                prot.write_field_end()?;
            }
            LogicalType::Date => write_union_marker(prot, "DATE", 6)?,
            LogicalType::Time {
                is_adjusted_to_utc,
                unit,
            } => write_temporal(prot, "TIME", 7, is_adjusted_to_utc, unit)?,
            LogicalType::Timestamp {
                is_adjusted_to_utc,
                unit,
            } => write_temporal(prot, "TIMESTAMP", 8, is_adjusted_to_utc, unit)?,
            LogicalType::Integer {
                bit_width,
                is_signed,
            } => {
                prot.write_field_begin(&TFieldIdentifier::new("INTEGER", TType::Struct, 10))?;
                prot.write_struct_begin(&TStructIdentifier::new("IntType"))?;
                prot.write_field_begin(&TFieldIdentifier::new("bitWidth", TType::I08, 1))?;
                prot.write_i8(bit_width)?;
                prot.write_field_end()?;
                write_bool(prot, "isSigned", 2, is_signed)?;
                prot.write_field_stop()?;
                prot.write_struct_end()?;
                prot.write_field_end()?;
            }
            LogicalType::Unknown => write_union_marker(prot, "UNKNOWN", 11)?,
            LogicalType::Json => write_union_marker(prot, "JSON", 12)?,
            LogicalType::Bson => write_union_marker(prot, "BSON", 13)?,
            LogicalType::Uuid => write_union_marker(prot, "UUID", 14)?,
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

fn write_union_marker(prot: &mut dyn TOutputProtocol, name: &str, id: i16) -> Result<()> {
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::Struct, id))?;
    write_empty(prot, name)?;
    prot.write_field_end()?;
    Ok(())
}

fn write_temporal(
    prot: &mut dyn TOutputProtocol,
    name: &str,
    id: i16,
    is_adjusted_to_utc: bool,
    unit: TimeUnit,
) -> Result<()> {
    prot.write_field_begin(&TFieldIdentifier::new(name, TType::Struct, id))?;
    prot.write_struct_begin(&TStructIdentifier::new(name))?;
    write_bool(prot, "isAdjustedToUTC", 1, is_adjusted_to_utc)?;
    prot.write_field_begin(&TFieldIdentifier::new("unit", TType::Struct, 2))?;
    write_time_unit(prot, unit)?;
    prot.write_field_end()?;
    prot.write_field_stop()?;
    prot.write_struct_end()?;
    prot.write_field_end()?;
    Ok(())
}

/// One node of the flattened, pre-order footer schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaElement {
    pub physical_type: Option<PhysicalType>,
    pub type_length: Option<i32>,
    pub repetition: Option<Repetition>,
    pub name: String,
    pub num_children: Option<i32>,
    pub converted_type: Option<ConvertedType>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
    pub field_id: Option<i32>,
    pub logical_type: Option<LogicalType>,
}

impl ThriftRecord for SchemaElement {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut element = SchemaElement::default();
        let mut name = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => element.physical_type = Some(PhysicalType::try_from(prot.read_i32()?)?),
                2 => element.type_length = Some(prot.read_i32()?),
                3 => element.repetition = Some(Repetition::try_from(prot.read_i32()?)?),
                4 => name = Some(prot.read_string()?),
                5 => element.num_children = Some(prot.read_i32()?),
                6 => element.converted_type = Some(ConvertedType::try_from(prot.read_i32()?)?),
                7 => element.scale = Some(prot.read_i32()?),
                8 => element.precision = Some(prot.read_i32()?),
                9 => element.field_id = Some(prot.read_i32()?),
                10 => element.logical_type = Some(LogicalType::read_from(prot)?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        element.name = required(name, "SchemaElement", "name")?;
        Ok(element)
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("SchemaElement"))?;
        if let Some(t) = self.physical_type {
            write_i32(prot, "type", 1, t.as_i32())?;
        }
        if let Some(v) = self.type_length {
            write_i32(prot, "type_length", 2, v)?;
        }
        if let Some(r) = self.repetition {
            write_i32(prot, "repetition_type", 3, r.as_i32())?;
        }
        write_string(prot, "name", 4, &self.name)?;
        if let Some(v) = self.num_children {
            write_i32(prot, "num_children", 5, v)?;
        }
        if let Some(c) = self.converted_type {
            write_i32(prot, "converted_type", 6, c.as_i32())?;
        }
        if let Some(v) = self.scale {
            write_i32(prot, "scale", 7, v)?;
        }
        if let Some(v) = self.precision {
            write_i32(prot, "precision", 8, v)?;
        }
        if let Some(v) = self.field_id {
            write_i32(prot, "field_id", 9, v)?;
        }
        if let Some(l) = &self.logical_type {
            write_struct(prot, "logicalType", 10, l)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub definition_level_encoding: Encoding,
    pub repetition_level_encoding: Encoding,
    pub statistics: Option<Statistics>,
}

impl ThriftRecord for DataPageHeader {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut num_values = None;
        let mut encoding = None;
        let mut def_encoding = None;
        let mut rep_encoding = None;
        let mut statistics = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => num_values = Some(prot.read_i32()?),
                2 => encoding = Some(Encoding::try_from(prot.read_i32()?)?),
                3 => def_encoding = Some(Encoding::try_from(prot.read_i32()?)?),
                4 => rep_encoding = Some(Encoding::try_from(prot.read_i32()?)?),
                5 => statistics = Some(Statistics::read_from(prot)?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        Ok(DataPageHeader {
            num_values: required(num_values, "DataPageHeader", "num_values")?,
            encoding: required(encoding, "DataPageHeader", "encoding")?,
            definition_level_encoding: required(
                def_encoding,
                "DataPageHeader",
                "definition_level_encoding",
            )?,
            repetition_level_encoding: required(
                rep_encoding,
                "DataPageHeader",
                "repetition_level_encoding",
            )?,
            statistics,
        })
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("DataPageHeader"))?;
        write_i32(prot, "num_values", 1, self.num_values)?;
        write_i32(prot, "encoding", 2, self.encoding.as_i32())?;
        write_i32(
            prot,
            "definition_level_encoding",
            3,
            self.definition_level_encoding.as_i32(),
        )?;
        write_i32(
            prot,
            "repetition_level_encoding",
            4,
            self.repetition_level_encoding.as_i32(),
        )?;
        if let Some(s) = &self.statistics {
            write_struct(prot, "statistics", 5, s)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub is_sorted: Option<bool>,
}

impl ThriftRecord for DictionaryPageHeader {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut num_values = None;
        let mut encoding = None;
        let mut is_sorted = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => num_values = Some(prot.read_i32()?),
                2 => encoding = Some(Encoding::try_from(prot.read_i32()?)?),
                3 => is_sorted = Some(prot.read_bool()?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        Ok(DictionaryPageHeader {
            num_values: required(num_values, "DictionaryPageHeader", "num_values")?,
            encoding: required(encoding, "DictionaryPageHeader", "encoding")?,
            is_sorted,
        })
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("DictionaryPageHeader"))?;
        write_i32(prot, "num_values", 1, self.num_values)?;
        write_i32(prot, "encoding", 2, self.encoding.as_i32())?;
        if let Some(v) = self.is_sorted {
            write_bool(prot, "is_sorted", 3, v)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPageHeaderV2 {
    pub num_values: i32,
    pub num_nulls: i32,
    pub num_rows: i32,
    pub encoding: Encoding,
    pub definition_levels_byte_length: i32,
    pub repetition_levels_byte_length: i32,
    pub is_compressed: Option<bool>,
    pub statistics: Option<Statistics>,
}

impl ThriftRecord for DataPageHeaderV2 {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut num_values = None;
        let mut num_nulls = None;
        let mut num_rows = None;
        let mut encoding = None;
        let mut def_len = None;
        let mut rep_len = None;
        let mut is_compressed = None;
        let mut statistics = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => num_values = Some(prot.read_i32()?),
                2 => num_nulls = Some(prot.read_i32()?),
                3 => num_rows = Some(prot.read_i32()?),
                4 => encoding = Some(Encoding::try_from(prot.read_i32()?)?),
                5 => def_len = Some(prot.read_i32()?),
                6 => rep_len = Some(prot.read_i32()?),
                7 => is_compressed = Some(prot.read_bool()?),
                8 => statistics = Some(Statistics::read_from(prot)?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        const NAME: &str = "DataPageHeaderV2";
        Ok(DataPageHeaderV2 {
            num_values: required(num_values, NAME, "num_values")?,
            num_nulls: required(num_nulls, NAME, "num_nulls")?,
            num_rows: required(num_rows, NAME, "num_rows")?,
            encoding: required(encoding, NAME, "encoding")?,
            definition_levels_byte_length: required(def_len, NAME, "definition_levels_byte_length")?,
            repetition_levels_byte_length: required(rep_len, NAME, "repetition_levels_byte_length")?,
            is_compressed,
            statistics,
        })
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("DataPageHeaderV2"))?;
        write_i32(prot, "num_values", 1, self.num_values)?;
        write_i32(prot, "num_nulls", 2, self.num_nulls)?;
        write_i32(prot, "num_rows", 3, self.num_rows)?;
        write_i32(prot, "encoding", 4, self.encoding.as_i32())?;
        write_i32(
            prot,
            "definition_levels_byte_length",
            5,
            self.definition_levels_byte_length,
        )?;
        write_i32(
            prot,
            "repetition_levels_byte_length",
            6,
            self.repetition_levels_byte_length,
        )?;
        if let Some(v) = self.is_compressed {
            write_bool(prot, "is_compressed", 7, v)?;
        }
        if let Some(s) = &self.statistics {
            write_struct(prot, "statistics", 8, s)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub crc: Option<i32>,
    pub data_page_header: Option<DataPageHeader>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

impl ThriftRecord for PageHeader {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut page_type = None;
        let mut uncompressed = None;
        let mut compressed = None;
        let mut crc = None;
        let mut data_page_header = None;
        let mut dictionary_page_header = None;
        let mut data_page_header_v2 = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => page_type = Some(PageType::try_from(prot.read_i32()?)?),
                2 => uncompressed = Some(prot.read_i32()?),
                3 => compressed = Some(prot.read_i32()?),
                4 => crc = Some(prot.read_i32()?),
                5 => data_page_header = Some(DataPageHeader::read_from(prot)?),
                7 => dictionary_page_header = Some(DictionaryPageHeader::read_from(prot)?),
                8 => data_page_header_v2 = Some(DataPageHeaderV2::read_from(prot)?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        let header = PageHeader {
            page_type: required(page_type, "PageHeader", "type")?,
            uncompressed_page_size: required(uncompressed, "PageHeader", "uncompressed_page_size")?,
            compressed_page_size: required(compressed, "PageHeader", "compressed_page_size")?,
            crc,
            data_page_header,
            dictionary_page_header,
            data_page_header_v2,
        };
        if header.uncompressed_page_size < 0 || header.compressed_page_size < 0 {
            return Err(ParquetError::format(format!(
                "negative page size: {} compressed, {} uncompressed",
                header.compressed_page_size, header.uncompressed_page_size
            )));
        }
        Ok(header)
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("PageHeader"))?;
        write_i32(prot, "type", 1, self.page_type.as_i32())?;
        write_i32(prot, "uncompressed_page_size", 2, self.uncompressed_page_size)?;
        write_i32(prot, "compressed_page_size", 3, self.compressed_page_size)?;
        if let Some(v) = self.crc {
            write_i32(prot, "crc", 4, v)?;
        }
        if let Some(h) = &self.data_page_header {
            write_struct(prot, "data_page_header", 5, h)?;
        }
        if let Some(h) = &self.dictionary_page_header {
            write_struct(prot, "dictionary_page_header", 7, h)?;
        }
        if let Some(h) = &self.data_page_header_v2 {
            write_struct(prot, "data_page_header_v2", 8, h)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl ThriftRecord for KeyValue {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut key = None;
        let mut value = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => key = Some(prot.read_string()?),
                2 => value = Some(prot.read_string()?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        Ok(KeyValue {
            key: required(key, "KeyValue", "key")?,
            value,
        })
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("KeyValue"))?;
        write_string(prot, "key", 1, &self.key)?;
        if let Some(v) = &self.value {
            write_string(prot, "value", 2, v)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetaData {
    pub physical_type: PhysicalType,
    pub encodings: Vec<Encoding>,
    pub path_in_schema: Vec<String>,
    pub codec: Compression,
    pub num_values: i64,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub data_page_offset: i64,
    pub index_page_offset: Option<i64>,
    pub dictionary_page_offset: Option<i64>,
    pub statistics: Option<Statistics>,
}

impl ThriftRecord for ColumnMetaData {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut physical_type = None;
        let mut encodings = None;
        let mut path = None;
        let mut codec = None;
        let mut num_values = None;
        let mut uncompressed = None;
        let mut compressed = None;
        let mut key_value_metadata = None;
        let mut data_page_offset = None;
        let mut index_page_offset = None;
        let mut dictionary_page_offset = None;
        let mut statistics = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => physical_type = Some(PhysicalType::try_from(prot.read_i32()?)?),
                2 => {
                    // Encodings this crate cannot decode are only a problem
                    // if a page actually uses them.
                    let ids = read_list(prot, |p| Ok(p.read_i32()?))?;
                    encodings = Some(
                        ids.into_iter()
                            .filter_map(|id| Encoding::try_from(id).ok())
                            .collect(),
                    );
                }
                3 => path = Some(read_list(prot, |p| Ok(p.read_string()?))?),
                4 => codec = Some(Compression::try_from(prot.read_i32()?)?),
                5 => num_values = Some(prot.read_i64()?),
                6 => uncompressed = Some(prot.read_i64()?),
                7 => compressed = Some(prot.read_i64()?),
                8 => key_value_metadata = Some(read_list(prot, KeyValue::read_from)?),
                9 => data_page_offset = Some(prot.read_i64()?),
                10 => index_page_offset = Some(prot.read_i64()?),
                11 => dictionary_page_offset = Some(prot.read_i64()?),
                12 => statistics = Some(Statistics::read_from(prot)?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        const NAME: &str = "ColumnMetaData";
        Ok(ColumnMetaData {
            physical_type: required(physical_type, NAME, "type")?,
            encodings: required(encodings, NAME, "encodings")?,
            path_in_schema: required(path, NAME, "path_in_schema")?,
            codec: required(codec, NAME, "codec")?,
            num_values: required(num_values, NAME, "num_values")?,
            total_uncompressed_size: required(uncompressed, NAME, "total_uncompressed_size")?,
            total_compressed_size: required(compressed, NAME, "total_compressed_size")?,
            key_value_metadata,
            data_page_offset: required(data_page_offset, NAME, "data_page_offset")?,
            index_page_offset,
            dictionary_page_offset,
            statistics,
        })
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("ColumnMetaData"))?;
        write_i32(prot, "type", 1, self.physical_type.as_i32())?;

        prot.write_field_begin(&TFieldIdentifier::new("encodings", TType::List, 2))?;
        prot.write_list_begin(&TListIdentifier::new(TType::I32, self.encodings.len() as i32))?;
        for e in &self.encodings {
            prot.write_i32(e.as_i32())?;
        }
        prot.write_list_end()?;
        prot.write_field_end()?;

        prot.write_field_begin(&TFieldIdentifier::new("path_in_schema", TType::List, 3))?;
        prot.write_list_begin(&TListIdentifier::new(
            TType::String,
            self.path_in_schema.len() as i32,
        ))?;
        for p in &self.path_in_schema {
            prot.write_string(p)?;
        }
        prot.write_list_end()?;
        prot.write_field_end()?;

        write_i32(prot, "codec", 4, self.codec.as_i32())?;
        write_i64(prot, "num_values", 5, self.num_values)?;
        write_i64(prot, "total_uncompressed_size", 6, self.total_uncompressed_size)?;
        write_i64(prot, "total_compressed_size", 7, self.total_compressed_size)?;
        if let Some(kv) = &self.key_value_metadata {
            write_struct_list(prot, "key_value_metadata", 8, kv)?;
        }
        write_i64(prot, "data_page_offset", 9, self.data_page_offset)?;
        if let Some(v) = self.index_page_offset {
            write_i64(prot, "index_page_offset", 10, v)?;
        }
        if let Some(v) = self.dictionary_page_offset {
            write_i64(prot, "dictionary_page_offset", 11, v)?;
        }
        if let Some(s) = &self.statistics {
            write_struct(prot, "statistics", 12, s)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChunk {
    pub file_path: Option<String>,
    pub file_offset: i64,
    pub meta_data: Option<ColumnMetaData>,
}

impl ThriftRecord for ColumnChunk {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut file_path = None;
        let mut file_offset = None;
        let mut meta_data = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => file_path = Some(prot.read_string()?),
                2 => file_offset = Some(prot.read_i64()?),
                3 => meta_data = Some(ColumnMetaData::read_from(prot)?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        Ok(ColumnChunk {
            file_path,
            file_offset: required(file_offset, "ColumnChunk", "file_offset")?,
            meta_data,
        })
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("ColumnChunk"))?;
        if let Some(p) = &self.file_path {
            write_string(prot, "file_path", 1, p)?;
        }
        write_i64(prot, "file_offset", 2, self.file_offset)?;
        if let Some(m) = &self.meta_data {
            write_struct(prot, "meta_data", 3, m)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub columns: Vec<ColumnChunk>,
    pub total_byte_size: i64,
    pub num_rows: i64,
    pub file_offset: Option<i64>,
    pub total_compressed_size: Option<i64>,
    pub ordinal: Option<i16>,
}

impl ThriftRecord for RowGroup {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut columns = None;
        let mut total_byte_size = None;
        let mut num_rows = None;
        let mut file_offset = None;
        let mut total_compressed_size = None;
        let mut ordinal = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => columns = Some(read_list(prot, ColumnChunk::read_from)?),
                2 => total_byte_size = Some(prot.read_i64()?),
                3 => num_rows = Some(prot.read_i64()?),
                5 => file_offset = Some(prot.read_i64()?),
                6 => total_compressed_size = Some(prot.read_i64()?),
                7 => ordinal = Some(prot.read_i16()?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        Ok(RowGroup {
            columns: required(columns, "RowGroup", "columns")?,
            total_byte_size: required(total_byte_size, "RowGroup", "total_byte_size")?,
            num_rows: required(num_rows, "RowGroup", "num_rows")?,
            file_offset,
            total_compressed_size,
            ordinal,
        })
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("RowGroup"))?;
        write_struct_list(prot, "columns", 1, &self.columns)?;
        write_i64(prot, "total_byte_size", 2, self.total_byte_size)?;
        write_i64(prot, "num_rows", 3, self.num_rows)?;
        if let Some(v) = self.file_offset {
            write_i64(prot, "file_offset", 5, v)?;
        }
        if let Some(v) = self.total_compressed_size {
            write_i64(prot, "total_compressed_size", 6, v)?;
        }
        if let Some(v) = self.ordinal {
            prot.write_field_begin(&TFieldIdentifier::new("ordinal", TType::I16, 7))?;
            prot.write_i16(v)?;
            prot.write_field_end()?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaData {
    pub version: i32,
    pub schema: Vec<SchemaElement>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroup>,
    pub key_value_metadata: Option<Vec<KeyValue>>,
    pub created_by: Option<String>,
}

impl ThriftRecord for FileMetaData {
    fn read_from(prot: &mut dyn TInputProtocol) -> Result<Self> {
        let mut version = None;
        let mut schema = None;
        let mut num_rows = None;
        let mut row_groups = None;
        let mut key_value_metadata = None;
        let mut created_by = None;
        prot.read_struct_begin()?;
        loop {
            let ident = prot.read_field_begin()?;
            if ident.field_type == TType::Stop {
                break;
            }
            match field_id(&ident)? {
                1 => version = Some(prot.read_i32()?),
                2 => schema = Some(read_list(prot, SchemaElement::read_from)?),
                3 => num_rows = Some(prot.read_i64()?),
                4 => row_groups = Some(read_list(prot, RowGroup::read_from)?),
                5 => key_value_metadata = Some(read_list(prot, KeyValue::read_from)?),
                6 => created_by = Some(prot.read_string()?),
                _ => prot.skip(ident.field_type)?,
            }
            prot.read_field_end()?;
        }
        prot.read_struct_end()?;
        Ok(FileMetaData {
            version: required(version, "FileMetaData", "version")?,
            schema: required(schema, "FileMetaData", "schema")?,
            num_rows: required(num_rows, "FileMetaData", "num_rows")?,
            row_groups: required(row_groups, "FileMetaData", "row_groups")?,
            key_value_metadata,
            created_by,
        })
    }

    fn write_to(&self, prot: &mut dyn TOutputProtocol) -> Result<()> {
        prot.write_struct_begin(&TStructIdentifier::new("FileMetaData"))?;
        write_i32(prot, "version", 1, self.version)?;
        write_struct_list(prot, "schema", 2, &self.schema)?;
        write_i64(prot, "num_rows", 3, self.num_rows)?;
        write_struct_list(prot, "row_groups", 4, &self.row_groups)?;
        if let Some(kv) = &self.key_value_metadata {
            write_struct_list(prot, "key_value_metadata", 5, kv)?;
        }
        if let Some(c) = &self.created_by {
            write_string(prot, "created_by", 6, c)?;
        }
        prot.write_field_stop()?;
        prot.write_struct_end()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: ThriftRecord + PartialEq + std::fmt::Debug>(record: &T) {
        let mut buf = Vec::new();
        write_record(record, &mut buf).unwrap();
        buf.extend_from_slice(b"tail");
        let (decoded, used) = read_record::<T>(&buf).unwrap();
        assert_eq!(&decoded, record);
        assert_eq!(&buf[used..], b"tail");
    }

    #[test]
    fn page_header_round_trip() {
        round_trip(&PageHeader {
            page_type: PageType::DataPage,
            uncompressed_page_size: 100,
            compressed_page_size: 60,
            crc: None,
            data_page_header: Some(DataPageHeader {
                num_values: 10,
                encoding: Encoding::RleDictionary,
                definition_level_encoding: Encoding::Rle,
                repetition_level_encoding: Encoding::Rle,
                statistics: Some(Statistics {
                    null_count: Some(2),
                    min_value: Some(vec![1, 0, 0, 0]),
                    max_value: Some(vec![9, 0, 0, 0]),
                    ..Default::default()
                }),
            }),
            dictionary_page_header: None,
            data_page_header_v2: None,
        });
        round_trip(&PageHeader {
            page_type: PageType::DataPageV2,
            uncompressed_page_size: 10,
            compressed_page_size: 10,
            crc: None,
            data_page_header: None,
            dictionary_page_header: None,
            data_page_header_v2: Some(DataPageHeaderV2 {
                num_values: 3,
                num_nulls: 1,
                num_rows: 2,
                encoding: Encoding::Plain,
                definition_levels_byte_length: 2,
                repetition_levels_byte_length: 2,
                is_compressed: Some(false),
                statistics: None,
            }),
        });
    }

    #[test]
    fn schema_elements_with_logical_types() {
        let logical_types = [
            LogicalType::String,
            LogicalType::Map,
            LogicalType::List,
            LogicalType::Enum,
            LogicalType::Decimal {
                scale: 2,
                precision: 9,
            },
            LogicalType::Date,
            LogicalType::Time {
                is_adjusted_to_utc: false,
                unit: TimeUnit::Millis,
            },
            LogicalType::Timestamp {
                is_adjusted_to_utc: true,
                unit: TimeUnit::Nanos,
            },
            LogicalType::Integer {
                bit_width: 16,
                is_signed: false,
            },
            LogicalType::Unknown,
            LogicalType::Json,
            LogicalType::Bson,
            LogicalType::Uuid,
        ];
        for logical in logical_types {
            round_trip(&SchemaElement {
                physical_type: Some(PhysicalType::ByteArray),
                repetition: Some(Repetition::Optional),
                name: "field".to_string(),
                logical_type: Some(logical),
                ..Default::default()
            });
        }
    }

    #[test]
    fn file_metadata_round_trip() {
        let column = ColumnChunk {
            file_path: None,
            file_offset: 4,
            meta_data: Some(ColumnMetaData {
                physical_type: PhysicalType::Int64,
                encodings: vec![Encoding::Rle, Encoding::Plain],
                path_in_schema: vec!["a".into(), "b".into()],
                codec: Compression::Snappy,
                num_values: 3,
                total_uncompressed_size: 40,
                total_compressed_size: 30,
                key_value_metadata: None,
                data_page_offset: 4,
                index_page_offset: None,
                dictionary_page_offset: None,
                statistics: None,
            }),
        };
        round_trip(&FileMetaData {
            version: 1,
            schema: vec![SchemaElement {
                name: "schema".into(),
                num_children: Some(0),
                ..Default::default()
            }],
            num_rows: 3,
            row_groups: vec![RowGroup {
                columns: vec![column],
                total_byte_size: 40,
                num_rows: 3,
                file_offset: Some(4),
                total_compressed_size: Some(30),
                ordinal: Some(0),
            }],
            key_value_metadata: Some(vec![KeyValue {
                key: "origin".into(),
                value: Some("test".into()),
            }]),
            created_by: Some("parquet-columnar".into()),
        });
    }

    #[test]
    fn missing_required_field_is_a_format_error() {
        let mut buf = Vec::new();
        {
            let mut prot = TCompactOutputProtocol::new(&mut buf);
            prot.write_struct_begin(&TStructIdentifier::new("PageHeader"))
                .unwrap();
            write_i32(&mut prot, "type", 1, 0).unwrap();
            prot.write_field_stop().unwrap();
            prot.write_struct_end().unwrap();
        }
        let err = read_record::<PageHeader>(&buf).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(read_record::<FileMetaData>(&[0xFF, 0xFF, 0xFF]).is_err());
    }
}
