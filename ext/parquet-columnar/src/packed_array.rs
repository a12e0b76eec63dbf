//! Append-only array of small unsigned integers packed at a fixed bit width.
//!
//! Used for repetition and definition levels. Values are bit-packed eight
//! at a time as soon as a group is complete, so element `i` of a full group
//! lives at bit offset `i * bit_width` and can be read without unpacking.

use crate::encoding::bitpack::{pack8_u32, read_bits, MAX_INDEX_BIT_WIDTH};
use crate::encoding::hybrid::{self, HybridDecoder};
use crate::{ParquetError, Result};

#[derive(Debug, Clone)]
pub struct PackedArray {
    bit_width: u8,
    /// Complete groups of eight.
    data: Vec<u8>,
    /// The trailing partial group.
    pending: [u32; 8],
    pending_len: usize,
    count: usize,
}

impl PackedArray {
    pub fn new(bit_width: u8) -> Result<Self> {
        if bit_width > MAX_INDEX_BIT_WIDTH {
            return Err(ParquetError::invalid_argument(format!(
                "packed array bit width {} outside of [0, {}]",
                bit_width, MAX_INDEX_BIT_WIDTH
            )));
        }
        Ok(PackedArray {
            bit_width,
            data: Vec::new(),
            pending: [0; 8],
            pending_len: 0,
            count: 0,
        })
    }

    /// Decodes `count` values from a hybrid stream into a new array.
    pub fn from_hybrid(data: &[u8], bit_width: u8, count: usize) -> Result<Self> {
        let mut array = PackedArray::new(bit_width)?;
        let mut decoder = HybridDecoder::new(data, bit_width)?;
        for _ in 0..count {
            array.append(decoder.next_value()?)?;
        }
        Ok(array)
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends one value. Values wider than the array's bit width are
    /// rejected rather than truncated.
    pub fn append(&mut self, value: u32) -> Result<()> {
        if self.bit_width < 32 && value >> self.bit_width != 0 {
            return Err(ParquetError::internal(format!(
                "value {} does not fit in {} bits",
                value, self.bit_width
            )));
        }
        self.pending[self.pending_len] = value;
        self.pending_len += 1;
        self.count += 1;
        if self.pending_len == 8 {
            pack8_u32(&self.pending, self.bit_width, &mut self.data)?;
            self.pending_len = 0;
        }
        Ok(())
    }

    /// Random access to element `i`.
    pub fn at(&self, i: usize) -> Option<u32> {
        if i >= self.count {
            return None;
        }
        let packed = self.count - self.pending_len;
        if i < packed {
            Some(read_bits(&self.data, i * self.bit_width as usize, self.bit_width))
        } else {
            Some(self.pending[i - packed])
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.count).filter_map(move |i| self.at(i))
    }

    /// Largest stored value, or 0 when empty.
    pub fn max(&self) -> u32 {
        self.iter().max().unwrap_or(0)
    }

    /// Drops all values, keeping the bit width.
    pub fn reset(&mut self) {
        self.data.clear();
        self.pending_len = 0;
        self.count = 0;
    }

    /// Encodes the values in `range` as a hybrid stream.
    pub fn encode_range(&self, range: std::ops::Range<usize>) -> Result<Vec<u8>> {
        let end = range.end.min(self.count);
        hybrid::encode(
            self.bit_width,
            (range.start..end).filter_map(|i| self.at(i)),
        )
    }

    /// Approximate heap footprint in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.len() + self.pending_len * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn random_access_at_width_13() {
        let mut rng = rand::rng();
        let values: Vec<u32> = (0..10_000).map(|_| rng.random_range(0..1 << 13)).collect();
        let mut array = PackedArray::new(13).unwrap();
        for &v in &values {
            array.append(v).unwrap();
        }
        assert_eq!(array.len(), 10_000);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(array.at(i), Some(v), "index {i}");
        }
        assert_eq!(array.at(10_000), None);
    }

    #[test]
    fn count_is_exact_with_partial_group() {
        let mut array = PackedArray::new(2).unwrap();
        for v in [3, 1, 0, 2, 1] {
            array.append(v).unwrap();
        }
        assert_eq!(array.len(), 5);
        assert_eq!(array.iter().collect::<Vec<_>>(), vec![3, 1, 0, 2, 1]);
        assert_eq!(array.max(), 3);
    }

    #[test]
    fn width_zero_holds_only_zeros() {
        let mut array = PackedArray::new(0).unwrap();
        for _ in 0..20 {
            array.append(0).unwrap();
        }
        assert_eq!(array.len(), 20);
        assert_eq!(array.at(19), Some(0));
        assert!(array.append(1).is_err());
    }

    #[test]
    fn hybrid_round_trip_of_a_range() {
        let mut array = PackedArray::new(3).unwrap();
        for v in 0..30u32 {
            array.append(v % 8).unwrap();
        }
        let stream = array.encode_range(5..22).unwrap();
        let decoded = PackedArray::from_hybrid(&stream, 3, 17).unwrap();
        let expected: Vec<u32> = (5..22u32).map(|v| v % 8).collect();
        assert_eq!(decoded.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn reset_keeps_width() {
        let mut array = PackedArray::new(4).unwrap();
        for v in 0..9 {
            array.append(v).unwrap();
        }
        array.reset();
        assert!(array.is_empty());
        assert_eq!(array.bit_width(), 4);
        array.append(15).unwrap();
        assert_eq!(array.at(0), Some(15));
    }
}
