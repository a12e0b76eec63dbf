use bytes::BufMut;

use crate::{ParquetError, Result};

/// All possible masks for an 8-byte wide value.
/// BITPACK_MASKS[n] = (1 << n) - 1
pub const BITPACK_MASKS: [u64; 65] = {
    let mut masks = [0; 65];
    let mut i = 0;
    while i < 64 {
        masks[i] = (1u64 << i) - 1;
        i += 1;
    }
    masks[64] = u64::MAX;
    masks
};

/// Number of bits needed to represent `v`.
pub fn num_required_bits(v: u64) -> u8 {
    (64 - v.leading_zeros()) as u8
}

/// Number of bytes needed to hold `bits` bits.
pub fn ceil_bytes(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Encodes a signed integer into a ZigZag-encoded unsigned integer.
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Decodes a ZigZag-encoded unsigned integer into a signed value.
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

/// Appends an unsigned LEB128 varint.
pub fn write_uvarint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.put_u8((v as u8) | 0x80);
        v >>= 7;
    }
    out.put_u8(v as u8);
}

/// Appends a zigzag varint.
pub fn write_zigzag(out: &mut Vec<u8>, v: i64) {
    write_uvarint(out, zigzag_encode(v));
}

/// Bounds-checked forward cursor over an encoded buffer.
///
/// Every read past the end is a format error rather than a panic.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Everything not yet consumed.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| ParquetError::format("unexpected end of buffer reading byte"))?;
        self.pos += 1;
        Ok(b)
    }

    /// Takes the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(ParquetError::format(format!(
                "unexpected end of buffer: need {} bytes, {} remaining",
                n,
                self.remaining()
            )));
        }
        let bs = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bs)
    }

    /// Skips up to `n` bytes, stopping at the end of the buffer.
    pub fn skip_saturating(&mut self, n: usize) {
        self.pos += n.min(self.remaining());
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bs = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bs[0], bs[1], bs[2], bs[3]]))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        let bs = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bs);
        Ok(u64::from_le_bytes(buf))
    }

    /// Reads an unsigned vlq.
    ///
    /// The most-significant bit acts as a continuation flag; the lower 7 bits are
    /// accumulated into the result in little-endian order.
    pub fn read_uvarint(&mut self) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(ParquetError::format("varint integer too large"));
            }
        }
    }

    pub fn read_zigzag(&mut self) -> Result<i64> {
        Ok(zigzag_decode(self.read_uvarint()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_tests() {
        // (zigzag encoded, decoded signed integer)
        let cases: &[(u64, i64)] = &[
            (0, 0),
            (1, -1),
            (2, 1),
            (3, -2),
            (4, 2),
            (5, -3),
            (6, 3),
            (7, -4),
        ];

        for &(encoded, expected) in cases {
            assert_eq!(expected, zigzag_decode(encoded), "zigzag encoded: {encoded}");
            assert_eq!(encoded, zigzag_encode(expected));
        }
        assert_eq!(zigzag_decode(zigzag_encode(i64::MIN)), i64::MIN);
        assert_eq!(zigzag_decode(zigzag_encode(i64::MAX)), i64::MAX);
    }

    #[test]
    fn read_unsigned_vlq_basic() {
        // 300 is 0xAC 0x02, 127 fits a single byte.
        let raw = [0xAC, 0x02, 0x7F];
        let mut reader = ByteReader::new(&raw);
        assert_eq!(reader.read_uvarint().unwrap(), 300);
        assert_eq!(reader.read_uvarint().unwrap(), 127);
        assert!(reader.is_empty());

        let mut out = Vec::new();
        write_uvarint(&mut out, 300);
        write_uvarint(&mut out, 127);
        assert_eq!(out, raw);
    }

    #[test]
    fn truncated_reads_are_format_errors() {
        let raw = [0x80, 0x80];
        let mut reader = ByteReader::new(&raw);
        assert!(reader.read_uvarint().unwrap_err().is_format_error());

        let mut reader = ByteReader::new(&raw);
        assert!(reader.read_u32_le().is_err());
    }

    #[test]
    fn required_bits() {
        assert_eq!(num_required_bits(0), 0);
        assert_eq!(num_required_bits(1), 1);
        assert_eq!(num_required_bits(2), 2);
        assert_eq!(num_required_bits(255), 8);
        assert_eq!(num_required_bits(256), 9);
        assert_eq!(num_required_bits(u64::MAX), 64);
        assert_eq!(BITPACK_MASKS[3], 0b111);
    }
}
