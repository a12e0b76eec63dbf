//! PLAIN encoding for every physical type.
//!
//! Numbers are little-endian, INT96 is three little-endian u32 words and
//! booleans are bit-packed least-significant bit first.

use bytes::{BufMut, Bytes};
use ordered_float::OrderedFloat;

use super::bitutil::{ceil_bytes, ByteReader};
use super::byte_array;
use crate::basic::PhysicalType;
use crate::{ParquetError, ParquetValue, Result};

fn mismatch(expected: PhysicalType, got: &ParquetValue) -> ParquetError {
    ParquetError::data_mismatch(format!(
        "cannot store {} value in {} column",
        got.type_name(),
        expected
    ))
}

/// Appends the PLAIN form of non-null `values`.
pub fn encode(
    physical_type: PhysicalType,
    type_length: usize,
    values: &[ParquetValue],
    out: &mut Vec<u8>,
) -> Result<()> {
    match physical_type {
        PhysicalType::Boolean => {
            let start = out.len();
            out.resize(start + ceil_bytes(values.len()), 0);
            for (i, v) in values.iter().enumerate() {
                match v {
                    ParquetValue::Boolean(true) => out[start + i / 8] |= 1 << (i % 8),
                    ParquetValue::Boolean(false) => {}
                    other => return Err(mismatch(physical_type, other)),
                }
            }
        }
        PhysicalType::Int32 => {
            for v in values {
                match v {
                    ParquetValue::Int32(i) => out.put_i32_le(*i),
                    other => return Err(mismatch(physical_type, other)),
                }
            }
        }
        PhysicalType::Int64 => {
            for v in values {
                match v {
                    ParquetValue::Int64(i) => out.put_i64_le(*i),
                    other => return Err(mismatch(physical_type, other)),
                }
            }
        }
        PhysicalType::Int96 => {
            for v in values {
                match v {
                    ParquetValue::Int96(words) => {
                        for w in words {
                            out.put_u32_le(*w);
                        }
                    }
                    other => return Err(mismatch(physical_type, other)),
                }
            }
        }
        PhysicalType::Float => {
            for v in values {
                match v {
                    ParquetValue::Float32(f) => out.put_f32_le(f.0),
                    other => return Err(mismatch(physical_type, other)),
                }
            }
        }
        PhysicalType::Double => {
            for v in values {
                match v {
                    ParquetValue::Float64(f) => out.put_f64_le(f.0),
                    other => return Err(mismatch(physical_type, other)),
                }
            }
        }
        PhysicalType::ByteArray => {
            byte_array::encode_plain(&collect_bytes(physical_type, values)?, out);
        }
        PhysicalType::FixedLenByteArray => {
            byte_array::encode_fixed(&collect_bytes(physical_type, values)?, type_length, out)?;
        }
    }
    Ok(())
}

/// Decodes exactly `count` PLAIN values.
pub fn decode(
    physical_type: PhysicalType,
    type_length: usize,
    reader: &mut ByteReader<'_>,
    count: usize,
) -> Result<Vec<ParquetValue>> {
    let cap = count.min(1 << 16);
    let values = match physical_type {
        PhysicalType::Boolean => {
            let bs = reader.read_bytes(ceil_bytes(count))?;
            (0..count)
                .map(|i| ParquetValue::Boolean((bs[i / 8] >> (i % 8)) & 1 == 1))
                .collect()
        }
        PhysicalType::Int32 => {
            let mut out = Vec::with_capacity(cap);
            for _ in 0..count {
                out.push(ParquetValue::Int32(reader.read_u32_le()? as i32));
            }
            out
        }
        PhysicalType::Int64 => {
            let mut out = Vec::with_capacity(cap);
            for _ in 0..count {
                out.push(ParquetValue::Int64(reader.read_u64_le()? as i64));
            }
            out
        }
        PhysicalType::Int96 => {
            let mut out = Vec::with_capacity(cap);
            for _ in 0..count {
                let words = [
                    reader.read_u32_le()?,
                    reader.read_u32_le()?,
                    reader.read_u32_le()?,
                ];
                out.push(ParquetValue::Int96(words));
            }
            out
        }
        PhysicalType::Float => {
            let mut out = Vec::with_capacity(cap);
            for _ in 0..count {
                let f = f32::from_bits(reader.read_u32_le()?);
                out.push(ParquetValue::Float32(OrderedFloat(f)));
            }
            out
        }
        PhysicalType::Double => {
            let mut out = Vec::with_capacity(cap);
            for _ in 0..count {
                let f = f64::from_bits(reader.read_u64_le()?);
                out.push(ParquetValue::Float64(OrderedFloat(f)));
            }
            out
        }
        PhysicalType::ByteArray => byte_array::decode_plain(reader, count)?
            .into_iter()
            .map(ParquetValue::Bytes)
            .collect(),
        PhysicalType::FixedLenByteArray => byte_array::decode_fixed(reader, count, type_length)?
            .into_iter()
            .map(ParquetValue::Bytes)
            .collect(),
    };
    Ok(values)
}

/// Extracts the byte payloads of byte-array values.
pub(crate) fn collect_bytes(
    physical_type: PhysicalType,
    values: &[ParquetValue],
) -> Result<Vec<Bytes>> {
    values
        .iter()
        .map(|v| match v {
            ParquetValue::Bytes(b) => Ok(b.clone()),
            other => Err(mismatch(physical_type, other)),
        })
        .collect()
}
