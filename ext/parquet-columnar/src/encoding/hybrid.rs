//! RLE / bit-packing hybrid stream, shared by repetition levels, definition
//! levels, boolean values and dictionary indices.
//!
//! A run header is a varint `(count << 1) | is_bit_packed`. Bit-packed runs
//! hold `count` groups of eight values; RLE runs repeat one value `count`
//! times, stored in `ceil(bit_width / 8)` bytes. The encoder always emits
//! bit-packed runs.

use super::bitpack::{pack8_u32, unpack8_u32, MAX_INDEX_BIT_WIDTH};
use super::bitutil::{ceil_bytes, write_uvarint, ByteReader};
use crate::{ParquetError, Result};

#[derive(Debug)]
pub struct HybridEncoder {
    bit_width: u8,
    /// Values not yet forming a full group of eight.
    pending: [u32; 8],
    pending_len: usize,
    /// Bit-packed groups of the open run.
    packed: Vec<u8>,
    groups: usize,
}

impl HybridEncoder {
    pub fn new(bit_width: u8) -> Result<Self> {
        if bit_width > MAX_INDEX_BIT_WIDTH {
            return Err(ParquetError::format(format!(
                "hybrid encoder bit width {} outside of [0, {}]",
                bit_width, MAX_INDEX_BIT_WIDTH
            )));
        }
        Ok(HybridEncoder {
            bit_width,
            pending: [0; 8],
            pending_len: 0,
            packed: Vec::new(),
            groups: 0,
        })
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    pub fn put(&mut self, value: u32) -> Result<()> {
        self.pending[self.pending_len] = value;
        self.pending_len += 1;
        if self.pending_len == 8 {
            pack8_u32(&self.pending, self.bit_width, &mut self.packed)?;
            self.pending_len = 0;
            self.groups += 1;
        }
        Ok(())
    }

    pub fn put_all<I: IntoIterator<Item = u32>>(&mut self, values: I) -> Result<()> {
        for v in values {
            self.put(v)?;
        }
        Ok(())
    }

    /// Pads the trailing partial group with zeros and returns the stream.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.pending_len > 0 {
            self.pending[self.pending_len..].fill(0);
            pack8_u32(&self.pending, self.bit_width, &mut self.packed)?;
            self.groups += 1;
        }
        let mut out = Vec::with_capacity(self.packed.len() + 5);
        if self.groups > 0 {
            write_uvarint(&mut out, ((self.groups as u64) << 1) | 1);
            out.extend_from_slice(&self.packed);
        }
        Ok(out)
    }
}

/// Encodes `values` into a standalone hybrid stream.
pub fn encode<I: IntoIterator<Item = u32>>(bit_width: u8, values: I) -> Result<Vec<u8>> {
    let mut enc = HybridEncoder::new(bit_width)?;
    enc.put_all(values)?;
    enc.finish()
}

#[derive(Debug)]
enum Run {
    None,
    Rle { value: u32, remaining: usize },
    Packed { groups_remaining: usize, buf: [u32; 8], idx: usize },
}

/// Lazily decodes a hybrid stream, eight values at a time.
#[derive(Debug)]
pub struct HybridDecoder<'a> {
    reader: ByteReader<'a>,
    bit_width: u8,
    run: Run,
}

impl<'a> HybridDecoder<'a> {
    pub fn new(data: &'a [u8], bit_width: u8) -> Result<Self> {
        if bit_width > MAX_INDEX_BIT_WIDTH {
            return Err(ParquetError::format(format!(
                "hybrid decoder bit width {} outside of [0, {}]",
                bit_width, MAX_INDEX_BIT_WIDTH
            )));
        }
        Ok(HybridDecoder {
            reader: ByteReader::new(data),
            bit_width,
            run: Run::None,
        })
    }

    /// Bytes consumed so far, including fully read runs.
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    fn next_run(&mut self) -> Result<()> {
        let header = self.reader.read_uvarint()?;
        let count = (header >> 1) as usize;
        if header & 1 == 1 {
            if count == 0 {
                return Err(ParquetError::format("empty bit-packed run"));
            }
            self.run = Run::Packed {
                groups_remaining: count,
                buf: [0; 8],
                idx: 8,
            };
        } else {
            let width = ceil_bytes(self.bit_width as usize);
            let bs = self.reader.read_bytes(width)?;
            let mut value = 0u32;
            for (i, b) in bs.iter().enumerate() {
                value |= (*b as u32) << (8 * i);
            }
            self.run = Run::Rle {
                value,
                remaining: count,
            };
        }
        Ok(())
    }

    pub fn next_value(&mut self) -> Result<u32> {
        loop {
            match &mut self.run {
                Run::Rle { value, remaining } if *remaining > 0 => {
                    *remaining -= 1;
                    return Ok(*value);
                }
                Run::Packed {
                    groups_remaining,
                    buf,
                    idx,
                } => {
                    if *idx < 8 {
                        let v = buf[*idx];
                        *idx += 1;
                        return Ok(v);
                    }
                    if *groups_remaining > 0 {
                        let bs = self.reader.read_bytes(self.bit_width as usize)?;
                        *buf = unpack8_u32(bs, self.bit_width)?;
                        *groups_remaining -= 1;
                        *idx = 0;
                        continue;
                    }
                }
                _ => {}
            }
            if self.reader.is_empty() {
                return Err(ParquetError::format("unexpected end of hybrid stream"));
            }
            self.next_run()?;
        }
    }

    /// Decodes exactly `count` values.
    pub fn decode(&mut self, count: usize) -> Result<Vec<u32>> {
        let mut out = Vec::with_capacity(count.min(1 << 20));
        for _ in 0..count {
            out.push(self.next_value()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn round_trip_every_width_with_partial_group() {
        let mut rng = rand::rng();
        for width in 0..=32u8 {
            let max = if width == 32 {
                u32::MAX
            } else {
                (1u32 << width).wrapping_sub(1)
            };
            let values: Vec<u32> = (0..77).map(|_| rng.random_range(0..=max)).collect();
            let encoded = encode(width, values.iter().copied()).unwrap();
            let mut dec = HybridDecoder::new(&encoded, width).unwrap();
            assert_eq!(dec.decode(values.len()).unwrap(), values, "width {width}");
        }
    }

    #[test]
    fn decodes_rle_runs() {
        // RLE run of 5 x 3 at width 2, then bit-packed group [1..8] at width 4
        let mut data = vec![5 << 1, 3];
        data.push((1 << 1) | 1);
        let mut packed = Vec::new();
        pack8_u32(&[1, 2, 3, 4, 5, 6, 7, 8], 4, &mut packed).unwrap();
        data.extend_from_slice(&packed);

        let mut dec = HybridDecoder::new(&data[..2], 2).unwrap();
        assert_eq!(dec.decode(5).unwrap(), vec![3; 5]);

        let mut dec = HybridDecoder::new(&data[2..], 4).unwrap();
        assert_eq!(dec.decode(8).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn empty_bit_packed_run_is_fatal() {
        let data = [1u8];
        let mut dec = HybridDecoder::new(&data, 3).unwrap();
        assert!(dec.next_value().unwrap_err().is_format_error());
    }

    #[test]
    fn invalid_bit_width_is_fatal() {
        assert!(HybridEncoder::new(33).is_err());
        assert!(HybridDecoder::new(&[], 40).is_err());
    }

    #[test]
    fn reading_past_the_end_fails() {
        let encoded = encode(3, [1, 2, 3]).unwrap();
        let mut dec = HybridDecoder::new(&encoded, 3).unwrap();
        // Padding of the final group is readable, the next run is not.
        assert_eq!(dec.decode(8).unwrap(), vec![1, 2, 3, 0, 0, 0, 0, 0]);
        assert!(dec.next_value().is_err());
    }

    #[test]
    fn empty_input_encodes_to_nothing() {
        assert!(encode(5, std::iter::empty()).unwrap().is_empty());
    }
}
