//! Value and level codecs.
//!
//! [`encode_values`] and [`decode_values`] dispatch a non-dictionary value
//! stream to the codec for its encoding. Dictionary-encoded pages are
//! handled by the page layer through [`dictionary`].

pub mod bitpack;
pub mod bitutil;
pub mod byte_array;
pub mod delta;
pub mod dictionary;
pub mod hybrid;
pub mod plain;

use bytes::BufMut;

use crate::basic::{Encoding, PhysicalType};
use crate::{ParquetError, ParquetValue, Result};
use bitutil::ByteReader;

/// Whether `encoding` can carry values of `physical_type` outside of a
/// dictionary.
pub fn supports(encoding: Encoding, physical_type: PhysicalType) -> bool {
    use PhysicalType::*;
    match encoding {
        Encoding::Plain => true,
        Encoding::Rle => physical_type == Boolean,
        Encoding::DeltaBinaryPacked => matches!(physical_type, Int32 | Int64),
        Encoding::DeltaLengthByteArray => physical_type == ByteArray,
        Encoding::DeltaByteArray => matches!(physical_type, ByteArray | FixedLenByteArray),
        Encoding::PlainDictionary | Encoding::RleDictionary | Encoding::BitPacked => false,
    }
}

/// Appends the encoded form of the non-null `values`.
pub fn encode_values(
    encoding: Encoding,
    physical_type: PhysicalType,
    type_length: usize,
    values: &[ParquetValue],
    out: &mut Vec<u8>,
) -> Result<()> {
    if !supports(encoding, physical_type) {
        return Err(ParquetError::unsupported(format!(
            "{} encoding for {} values",
            encoding, physical_type
        )));
    }
    match encoding {
        Encoding::Plain => plain::encode(physical_type, type_length, values, out),
        Encoding::Rle => {
            let bits = values
                .iter()
                .map(|v| match v {
                    ParquetValue::Boolean(b) => Ok(*b as u32),
                    other => Err(ParquetError::data_mismatch(format!(
                        "cannot store {} value in Boolean column",
                        other.type_name()
                    ))),
                })
                .collect::<Result<Vec<u32>>>()?;
            let stream = hybrid::encode(1, bits)?;
            out.put_u32_le(stream.len() as u32);
            out.extend_from_slice(&stream);
            Ok(())
        }
        Encoding::DeltaBinaryPacked => {
            match physical_type {
                PhysicalType::Int32 => {
                    let ints = values
                        .iter()
                        .map(|v| match v {
                            ParquetValue::Int32(i) => Ok(*i),
                            other => Err(int_mismatch(physical_type, other)),
                        })
                        .collect::<Result<Vec<i32>>>()?;
                    delta::encode(&ints, out);
                }
                _ => {
                    let ints = values
                        .iter()
                        .map(|v| match v {
                            ParquetValue::Int64(i) => Ok(*i),
                            other => Err(int_mismatch(physical_type, other)),
                        })
                        .collect::<Result<Vec<i64>>>()?;
                    delta::encode(&ints, out);
                }
            }
            Ok(())
        }
        Encoding::DeltaLengthByteArray => {
            byte_array::encode_delta_length(&plain::collect_bytes(physical_type, values)?, out);
            Ok(())
        }
        Encoding::DeltaByteArray => {
            let bytes = plain::collect_bytes(physical_type, values)?;
            if physical_type == PhysicalType::FixedLenByteArray {
                if let Some(bad) = bytes.iter().find(|b| b.len() != type_length) {
                    return Err(ParquetError::data_mismatch(format!(
                        "fixed length byte array expects {} bytes, got {}",
                        type_length,
                        bad.len()
                    )));
                }
            }
            byte_array::encode_delta(&bytes, out);
            Ok(())
        }
        Encoding::PlainDictionary | Encoding::RleDictionary | Encoding::BitPacked => Err(
            ParquetError::internal(format!("{} is not a value stream encoding", encoding)),
        ),
    }
}

fn int_mismatch(physical_type: PhysicalType, got: &ParquetValue) -> ParquetError {
    ParquetError::data_mismatch(format!(
        "cannot store {} value in {} column",
        got.type_name(),
        physical_type
    ))
}

/// Decodes exactly `count` non-null values.
pub fn decode_values(
    encoding: Encoding,
    physical_type: PhysicalType,
    type_length: usize,
    data: &[u8],
    count: usize,
) -> Result<Vec<ParquetValue>> {
    if !supports(encoding, physical_type) {
        return Err(ParquetError::format(format!(
            "{} encoding is not valid for {} values",
            encoding, physical_type
        )));
    }
    let mut reader = ByteReader::new(data);
    let values = match encoding {
        Encoding::Plain => plain::decode(physical_type, type_length, &mut reader, count)?,
        Encoding::Rle => {
            let len = reader.read_u32_le()? as usize;
            let stream = reader.read_bytes(len)?;
            hybrid::HybridDecoder::new(stream, 1)?
                .decode(count)?
                .into_iter()
                .map(|b| ParquetValue::Boolean(b != 0))
                .collect()
        }
        Encoding::DeltaBinaryPacked => match physical_type {
            PhysicalType::Int32 => delta::decode::<i32>(&mut reader)?
                .into_iter()
                .map(ParquetValue::Int32)
                .collect(),
            _ => delta::decode::<i64>(&mut reader)?
                .into_iter()
                .map(ParquetValue::Int64)
                .collect(),
        },
        Encoding::DeltaLengthByteArray => byte_array::decode_delta_length(&mut reader)?
            .into_iter()
            .map(ParquetValue::Bytes)
            .collect(),
        Encoding::DeltaByteArray => byte_array::decode_delta(&mut reader)?
            .into_iter()
            .map(ParquetValue::Bytes)
            .collect(),
        Encoding::PlainDictionary | Encoding::RleDictionary | Encoding::BitPacked => {
            return Err(ParquetError::internal(format!(
                "{} is not a value stream encoding",
                encoding
            )))
        }
    };
    if values.len() < count {
        return Err(ParquetError::format(format!(
            "{} stream holds {} values, page declares {}",
            encoding,
            values.len(),
            count
        )));
    }
    let mut values = values;
    values.truncate(count);
    Ok(values)
}
