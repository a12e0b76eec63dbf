//! Byte-array codecs: PLAIN (length-prefixed or fixed length),
//! DELTA_LENGTH_BYTE_ARRAY and DELTA_BYTE_ARRAY (prefix compression).

use bytes::{BufMut, Bytes};

use super::bitutil::ByteReader;
use super::delta;
use crate::{ParquetError, Result};

pub fn encode_plain(values: &[Bytes], out: &mut Vec<u8>) {
    for v in values {
        out.put_u32_le(v.len() as u32);
        out.extend_from_slice(v);
    }
}

pub fn decode_plain(reader: &mut ByteReader<'_>, count: usize) -> Result<Vec<Bytes>> {
    let mut values = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        let len = reader.read_u32_le()? as i32;
        if len < 0 {
            return Err(ParquetError::format(format!(
                "negative byte array length {}",
                len
            )));
        }
        values.push(Bytes::copy_from_slice(reader.read_bytes(len as usize)?));
    }
    Ok(values)
}

/// Writes fixed-length values back to back; every value must be `type_length`
/// bytes long.
pub fn encode_fixed(values: &[Bytes], type_length: usize, out: &mut Vec<u8>) -> Result<()> {
    for v in values {
        if v.len() != type_length {
            return Err(ParquetError::data_mismatch(format!(
                "fixed length byte array expects {} bytes, got {}",
                type_length,
                v.len()
            )));
        }
        out.extend_from_slice(v);
    }
    Ok(())
}

pub fn decode_fixed(
    reader: &mut ByteReader<'_>,
    count: usize,
    type_length: usize,
) -> Result<Vec<Bytes>> {
    let mut values = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        values.push(Bytes::copy_from_slice(reader.read_bytes(type_length)?));
    }
    Ok(values)
}

/// Delta-packed lengths followed by the concatenated value bytes.
pub fn encode_delta_length(values: &[Bytes], out: &mut Vec<u8>) {
    let lengths: Vec<i32> = values.iter().map(|v| v.len() as i32).collect();
    delta::encode(&lengths, out);
    for v in values {
        out.extend_from_slice(v);
    }
}

pub fn decode_delta_length(reader: &mut ByteReader<'_>) -> Result<Vec<Bytes>> {
    let lengths: Vec<i32> = delta::decode(reader)?;
    let mut values = Vec::with_capacity(lengths.len());
    for len in lengths {
        if len < 0 {
            return Err(ParquetError::format(format!(
                "negative byte array length {}",
                len
            )));
        }
        values.push(Bytes::copy_from_slice(reader.read_bytes(len as usize)?));
    }
    Ok(values)
}

/// Prefix lengths shared with the previous value, delta-packed, followed by
/// the remaining suffixes in DELTA_LENGTH_BYTE_ARRAY form.
pub fn encode_delta(values: &[Bytes], out: &mut Vec<u8>) {
    let mut prefixes = Vec::with_capacity(values.len());
    let mut suffixes = Vec::with_capacity(values.len());
    let mut previous: &[u8] = &[];
    for v in values {
        let shared = previous
            .iter()
            .zip(v.iter())
            .take_while(|(a, b)| a == b)
            .count();
        prefixes.push(shared as i32);
        suffixes.push(v.slice(shared..));
        previous = &v[..];
    }
    delta::encode(&prefixes, out);
    encode_delta_length(&suffixes, out);
}

pub fn decode_delta(reader: &mut ByteReader<'_>) -> Result<Vec<Bytes>> {
    let prefixes: Vec<i32> = delta::decode(reader)?;
    let suffixes = decode_delta_length(reader)?;
    if prefixes.len() != suffixes.len() {
        return Err(ParquetError::format(format!(
            "delta byte array has {} prefix lengths but {} suffixes",
            prefixes.len(),
            suffixes.len()
        )));
    }

    let mut values: Vec<Bytes> = Vec::with_capacity(prefixes.len());
    let mut previous = Bytes::new();
    for (prefix, suffix) in prefixes.into_iter().zip(suffixes) {
        if prefix < 0 || prefix as usize > previous.len() {
            return Err(ParquetError::format(format!(
                "prefix length {} exceeds previous value length {}",
                prefix,
                previous.len()
            )));
        }
        let value = if prefix == 0 {
            suffix
        } else {
            let mut buf = Vec::with_capacity(prefix as usize + suffix.len());
            buf.extend_from_slice(&previous[..prefix as usize]);
            buf.extend_from_slice(&suffix);
            Bytes::from(buf)
        };
        previous = value.clone();
        values.push(value);
    }
    Ok(values)
}
