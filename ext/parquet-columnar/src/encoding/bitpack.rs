//! Fixed-width packing of 8-value blocks.
//!
//! Values are laid out least-significant bit first, so a block of eight
//! values at bit width `w` occupies exactly `w` bytes.

use super::bitutil::BITPACK_MASKS;
use crate::{ParquetError, Result};

/// Largest bit width used for levels and dictionary indices.
pub const MAX_INDEX_BIT_WIDTH: u8 = 32;

/// Packs eight values at `bit_width` bits each, appending `bit_width` bytes.
///
/// Bits above `bit_width` are ignored.
pub fn pack8(values: &[u64; 8], bit_width: u8, out: &mut Vec<u8>) {
    debug_assert!(bit_width <= 64);
    let mask = BITPACK_MASKS[bit_width as usize];
    let w = bit_width as u32;
    let mut acc: u128 = 0;
    let mut bits = 0u32;
    for &v in values {
        acc |= ((v & mask) as u128) << bits;
        bits += w;
        while bits >= 8 {
            out.push(acc as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
}

/// Unpacks eight values of `bit_width` bits from the front of `input`.
pub fn unpack8(input: &[u8], bit_width: u8) -> Result<[u64; 8]> {
    if bit_width > 64 {
        return Err(ParquetError::format(format!(
            "invalid bit width {}",
            bit_width
        )));
    }
    let mut out = [0u64; 8];
    if bit_width == 0 {
        return Ok(out);
    }
    let needed = bit_width as usize;
    if input.len() < needed {
        return Err(ParquetError::format(format!(
            "bit-packed block needs {} bytes, {} available",
            needed,
            input.len()
        )));
    }

    let mask = BITPACK_MASKS[bit_width as usize];
    let w = bit_width as u32;
    let mut acc: u128 = 0;
    let mut bits = 0u32;
    let mut pos = 0;
    for slot in out.iter_mut() {
        while bits < w {
            acc |= (input[pos] as u128) << bits;
            pos += 1;
            bits += 8;
        }
        *slot = (acc as u64) & mask;
        acc >>= w;
        bits -= w;
    }
    Ok(out)
}

/// Packs eight 32-bit values, for levels and dictionary indices.
pub fn pack8_u32(values: &[u32; 8], bit_width: u8, out: &mut Vec<u8>) -> Result<()> {
    check_index_width(bit_width)?;
    pack8(&values.map(u64::from), bit_width, out);
    Ok(())
}

/// Unpacks eight 32-bit values, for levels and dictionary indices.
pub fn unpack8_u32(input: &[u8], bit_width: u8) -> Result<[u32; 8]> {
    check_index_width(bit_width)?;
    Ok(unpack8(input, bit_width)?.map(|v| v as u32))
}

fn check_index_width(bit_width: u8) -> Result<()> {
    if bit_width > MAX_INDEX_BIT_WIDTH {
        return Err(ParquetError::format(format!(
            "bit width {} outside of [0, {}]",
            bit_width, MAX_INDEX_BIT_WIDTH
        )));
    }
    Ok(())
}

/// Reads `bit_width` bits starting at absolute bit offset `bit_offset`.
///
/// Used for random access into packed blocks; `bit_width` is at most 32.
pub fn read_bits(data: &[u8], bit_offset: usize, bit_width: u8) -> u32 {
    if bit_width == 0 {
        return 0;
    }
    let first = bit_offset / 8;
    let shift = bit_offset % 8;
    let mut acc: u64 = 0;
    let span = (shift + bit_width as usize).div_ceil(8);
    for i in 0..span {
        let byte = data.get(first + i).copied().unwrap_or(0);
        acc |= (byte as u64) << (8 * i);
    }
    ((acc >> shift) & BITPACK_MASKS[bit_width as usize]) as u32
}
