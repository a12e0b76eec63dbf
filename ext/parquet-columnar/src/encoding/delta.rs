//! DELTA_BINARY_PACKED codec for INT32 and INT64.
//!
//! Layout: `<block size> <miniblocks per block> <total count> <first value>`
//! as varints (the first value zigzag), then blocks of
//! `<min delta (zigzag)> <one width byte per miniblock> <miniblocks>`.
//! Deltas use wrapping arithmetic in the value's own width, so the codec is
//! exact even when consecutive values overflow when subtracted.

use super::bitpack::{pack8, unpack8};
use super::bitutil::{num_required_bits, write_uvarint, write_zigzag, ByteReader};
use crate::{ParquetError, Result};

pub const DEFAULT_BLOCK_SIZE: usize = 128;
pub const DEFAULT_MINIBLOCK_COUNT: usize = 4;

/// Integer types the delta codec operates on.
pub trait DeltaInt: Copy + Default + std::fmt::Debug {
    const BITS: u8;

    fn wrapping_sub(self, other: Self) -> Self;
    fn wrapping_add(self, other: Self) -> Self;
    fn min_signed(self, other: Self) -> Self;
    /// Reinterprets the value as unsigned bits of the same width.
    fn to_bits(self) -> u64;
    /// Truncates to the type's width.
    fn from_bits(bits: u64) -> Self;
    fn to_i64(self) -> i64;
    fn from_i64(v: i64) -> Self;
}

impl DeltaInt for i32 {
    const BITS: u8 = 32;

    fn wrapping_sub(self, other: Self) -> Self {
        i32::wrapping_sub(self, other)
    }
    fn wrapping_add(self, other: Self) -> Self {
        i32::wrapping_add(self, other)
    }
    fn min_signed(self, other: Self) -> Self {
        self.min(other)
    }
    fn to_bits(self) -> u64 {
        self as u32 as u64
    }
    fn from_bits(bits: u64) -> Self {
        bits as u32 as i32
    }
    fn to_i64(self) -> i64 {
        self as i64
    }
    fn from_i64(v: i64) -> Self {
        v as i32
    }
}

impl DeltaInt for i64 {
    const BITS: u8 = 64;

    fn wrapping_sub(self, other: Self) -> Self {
        i64::wrapping_sub(self, other)
    }
    fn wrapping_add(self, other: Self) -> Self {
        i64::wrapping_add(self, other)
    }
    fn min_signed(self, other: Self) -> Self {
        self.min(other)
    }
    fn to_bits(self) -> u64 {
        self as u64
    }
    fn from_bits(bits: u64) -> Self {
        bits as i64
    }
    fn to_i64(self) -> i64 {
        self
    }
    fn from_i64(v: i64) -> Self {
        v
    }
}

/// Encodes a whole sequence with the default block geometry.
pub fn encode<T: DeltaInt>(values: &[T], out: &mut Vec<u8>) {
    encode_with(values, DEFAULT_BLOCK_SIZE, DEFAULT_MINIBLOCK_COUNT, out)
}

/// Encodes with a custom block geometry. `block_size / miniblock_count` must
/// be a multiple of 8.
pub fn encode_with<T: DeltaInt>(
    values: &[T],
    block_size: usize,
    miniblock_count: usize,
    out: &mut Vec<u8>,
) {
    debug_assert!(miniblock_count > 0 && block_size % miniblock_count == 0);
    let per_miniblock = block_size / miniblock_count;
    debug_assert!(per_miniblock % 8 == 0);

    write_uvarint(out, block_size as u64);
    write_uvarint(out, miniblock_count as u64);
    write_uvarint(out, values.len() as u64);
    let first = values.first().copied().unwrap_or_default();
    write_zigzag(out, first.to_i64());

    match values.len() {
        0 => return,
        1 => {
            // No deltas, but the stream still carries one well-formed block.
            write_zigzag(out, 0);
            out.extend(std::iter::repeat_n(0u8, miniblock_count));
            return;
        }
        _ => {}
    }

    let deltas: Vec<T> = values
        .windows(2)
        .map(|w| w[1].wrapping_sub(w[0]))
        .collect();

    let mut widths = vec![0u8; miniblock_count];
    let mut adjusted = vec![0u64; block_size];
    for block in deltas.chunks(block_size) {
        let min_delta = block
            .iter()
            .copied()
            .reduce(|a, b| a.min_signed(b))
            .unwrap_or_default();

        adjusted.iter_mut().for_each(|v| *v = 0);
        for (dst, d) in adjusted.iter_mut().zip(block) {
            *dst = d.wrapping_sub(min_delta).to_bits();
        }

        let used = block.len().div_ceil(per_miniblock);
        for (i, width) in widths.iter_mut().enumerate() {
            *width = if i < used {
                let mb = &adjusted[i * per_miniblock..(i + 1) * per_miniblock];
                num_required_bits(mb.iter().copied().max().unwrap_or(0))
            } else {
                0
            };
        }

        write_zigzag(out, min_delta.to_i64());
        out.extend_from_slice(&widths);
        for (i, &width) in widths.iter().enumerate().take(used) {
            let mb = &adjusted[i * per_miniblock..(i + 1) * per_miniblock];
            for group in mb.chunks_exact(8) {
                let mut vals = [0u64; 8];
                vals.copy_from_slice(group);
                pack8(&vals, width, out);
            }
        }
    }
}

/// Decodes one delta stream, leaving the reader positioned right after it.
pub fn decode<T: DeltaInt>(reader: &mut ByteReader<'_>) -> Result<Vec<T>> {
    let block_size = reader.read_uvarint()? as usize;
    let miniblock_count = reader.read_uvarint()? as usize;
    let total = reader.read_uvarint()? as usize;
    let first = T::from_i64(reader.read_zigzag()?);

    if miniblock_count == 0 || block_size == 0 || block_size % miniblock_count != 0 {
        return Err(ParquetError::format(format!(
            "invalid delta block geometry: block size {}, {} miniblocks",
            block_size, miniblock_count
        )));
    }
    let per_miniblock = block_size / miniblock_count;
    if per_miniblock % 8 != 0 {
        return Err(ParquetError::format(format!(
            "miniblock size {} is not a multiple of 8",
            per_miniblock
        )));
    }
    if total > i32::MAX as usize {
        return Err(ParquetError::format(format!(
            "delta stream declares {} values",
            total
        )));
    }

    if total == 0 {
        return Ok(Vec::new());
    }

    let mut values = Vec::with_capacity(total.min(1 << 20));
    values.push(first);
    let mut last = first;
    let mut remaining = total - 1;
    let mut widths = vec![0u8; miniblock_count];

    // A single value still has a degenerate block behind it.
    let mut read_one_block = remaining == 0;
    while remaining > 0 || read_one_block {
        read_one_block = false;
        let min_delta = T::from_i64(reader.read_zigzag()?);
        widths.copy_from_slice(reader.read_bytes(miniblock_count)?);

        for &width in widths.iter() {
            if width > T::BITS {
                return Err(ParquetError::format(format!(
                    "miniblock bit width {} exceeds {}",
                    width,
                    T::BITS
                )));
            }
            let body = per_miniblock / 8 * width as usize;
            if remaining == 0 {
                // Unused trailing miniblock; skip whatever the writer declared.
                reader.skip_saturating(body);
                continue;
            }
            let data = reader.read_bytes(body)?;
            for group in data.chunks_exact(width.max(1) as usize).take(per_miniblock / 8) {
                let unpacked = unpack8(group, width)?;
                push_deltas(&unpacked, min_delta, &mut last, &mut remaining, &mut values);
            }
            if width == 0 {
                let zeros = [0u64; 8];
                for _ in 0..per_miniblock / 8 {
                    push_deltas(&zeros, min_delta, &mut last, &mut remaining, &mut values);
                }
            }
        }
    }

    Ok(values)
}

fn push_deltas<T: DeltaInt>(
    unpacked: &[u64; 8],
    min_delta: T,
    last: &mut T,
    remaining: &mut usize,
    values: &mut Vec<T>,
) {
    for &d in unpacked.iter() {
        if *remaining == 0 {
            return;
        }
        let v = last.wrapping_add(min_delta).wrapping_add(T::from_bits(d));
        values.push(v);
        *last = v;
        *remaining -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn round_trip<T: DeltaInt + PartialEq>(values: &[T]) {
        let mut out = Vec::new();
        encode(values, &mut out);
        let mut reader = ByteReader::new(&out);
        let decoded: Vec<T> = decode(&mut reader).unwrap();
        assert_eq!(decoded, values);
        assert!(reader.is_empty(), "stream not fully consumed");
    }

    #[test]
    fn single_value() {
        round_trip(&[42i32]);
        round_trip(&[-7i64]);
    }

    #[test]
    fn empty_sequence() {
        round_trip::<i32>(&[]);
    }

    #[test]
    fn lengths_not_multiple_of_block_size() {
        for len in [2usize, 7, 8, 9, 31, 32, 33, 127, 128, 129, 130, 257, 1000] {
            let values: Vec<i32> = (0..len as i32).map(|i| i * 3 - 50).collect();
            round_trip(&values);
        }
    }

    #[test]
    fn wrapping_extremes() {
        round_trip(&[i32::MIN, i32::MAX, i32::MIN, 0, i32::MAX]);
        round_trip(&[i64::MAX, i64::MIN, 1, i64::MIN, i64::MAX]);
    }

    #[test]
    fn random_sequences() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let len = rng.random_range(1..600);
            let a: Vec<i32> = (0..len).map(|_| rng.random()).collect();
            round_trip(&a);
            let b: Vec<i64> = (0..len).map(|_| rng.random_range(-1000..1000)).collect();
            round_trip(&b);
        }
    }

    #[test]
    fn constant_runs_use_zero_width() {
        let values = vec![5i64; 300];
        let mut out = Vec::new();
        encode(&values, &mut out);
        // header + 3 blocks of (min delta + 4 width bytes), no bodies
        assert!(out.len() < 24, "encoded {} bytes", out.len());
        round_trip(&values);
    }

    #[test]
    fn trailing_declared_miniblocks_are_skipped() {
        // Two values; the writer declared width 8 for the unused miniblocks
        // and padded their bodies.
        let mut out = Vec::new();
        write_uvarint(&mut out, 128);
        write_uvarint(&mut out, 4);
        write_uvarint(&mut out, 2);
        write_zigzag(&mut out, 10);
        write_zigzag(&mut out, 5);
        out.extend_from_slice(&[0, 8, 8, 8]);
        out.extend(std::iter::repeat_n(0xAAu8, 3 * 32));
        out.push(0xEE);

        let mut reader = ByteReader::new(&out);
        let decoded: Vec<i32> = decode(&mut reader).unwrap();
        assert_eq!(decoded, vec![10, 15]);
        assert_eq!(reader.rest(), &[0xEE]);
    }

    #[test]
    fn bad_geometry_is_rejected() {
        let mut out = Vec::new();
        write_uvarint(&mut out, 100);
        write_uvarint(&mut out, 3);
        write_uvarint(&mut out, 5);
        write_zigzag(&mut out, 0);
        let mut reader = ByteReader::new(&out);
        assert!(decode::<i32>(&mut reader).is_err());
    }
}
