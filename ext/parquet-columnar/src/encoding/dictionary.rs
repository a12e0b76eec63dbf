//! Dictionary index streams: one byte holding the index bit width, followed
//! by the indices as an RLE/bit-packed hybrid stream.

use super::bitpack::MAX_INDEX_BIT_WIDTH;
use super::bitutil::num_required_bits;
use super::hybrid::{self, HybridDecoder};
use crate::{ParquetError, Result};

/// Bit width used for indices into a dictionary of `dict_len` entries.
///
/// Never 0, so a stream always carries at least one bit per index.
pub fn index_bit_width(dict_len: usize) -> u8 {
    num_required_bits(dict_len.saturating_sub(1) as u64).max(1)
}

pub fn encode_indices(indices: &[u32], dict_len: usize) -> Result<Vec<u8>> {
    let width = index_bit_width(dict_len);
    let mut out = vec![width];
    out.extend(hybrid::encode(width, indices.iter().copied())?);
    Ok(out)
}

/// Decodes `count` indices, checking each against the dictionary size.
pub fn decode_indices(data: &[u8], count: usize, dict_len: usize) -> Result<Vec<u32>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let (&width, rest) = data
        .split_first()
        .ok_or_else(|| ParquetError::format("dictionary index stream is empty"))?;
    if width > MAX_INDEX_BIT_WIDTH {
        return Err(ParquetError::format(format!(
            "dictionary index bit width {} outside of [0, {}]",
            width, MAX_INDEX_BIT_WIDTH
        )));
    }
    if width == 0 && dict_len > 0 {
        return Err(ParquetError::format(format!(
            "dictionary index bit width 0 with {} dictionary entries",
            dict_len
        )));
    }

    let mut decoder = HybridDecoder::new(rest, width)?;
    let mut out = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        let idx = decoder.next_value()?;
        if idx as usize >= dict_len {
            return Err(ParquetError::format(format!(
                "dictionary index {} out of range for {} entries",
                idx, dict_len
            )));
        }
        out.push(idx);
    }
    Ok(out)
}
