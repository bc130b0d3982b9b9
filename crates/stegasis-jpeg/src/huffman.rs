//! Canonical Huffman tables for JPEG entropy coding.
//!
//! [`HuffmanTable`] is the decode side, built from a DHT segment.
//! [`HuffmanEncoder`] is the encode side, built from a fixed [`HuffmanSpec`].

use crate::error::{JpegError, Result};

/// Maximum (inclusive) number of bits in a Huffman code.
pub const MAX_CODE_LENGTH: usize = 16;

/// Maximum (inclusive) number of codes in a Huffman table.
pub const MAX_CODES: usize = 256;

/// Number of bits resolved by the decoder's look-up table.
pub(crate) const LUT_BITS: u32 = 8;

/// A Huffman table specification as carried by a DHT segment.
#[derive(Clone, Copy, Debug)]
pub struct HuffmanSpec {
    /// `counts[i]` is the number of codes of length `i + 1` bits.
    pub counts: [u8; MAX_CODE_LENGTH],
    /// Symbols in code order.
    pub values: &'static [u8],
}

/// Huffman decode table (ITU T.81 section C and F.2.2.3).
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Total number of codes.
    n_codes: usize,
    /// Symbols sorted by their code.
    vals: Vec<u8>,
    /// `min_code[i]` is the smallest code of length `i + 1`, or -1.
    min_code: [i32; MAX_CODE_LENGTH],
    /// `max_code[i]` is the largest code of length `i + 1`, or -1.
    max_code: [i32; MAX_CODE_LENGTH],
    /// `vals_index[i]` is the index into `vals` of `min_code[i]`, or -1.
    vals_index: [i32; MAX_CODE_LENGTH],
    /// Fast path for codes of at most [`LUT_BITS`] bits, indexed by the next
    /// 8 bits of the stream. High byte is the symbol, low byte is the code
    /// length; zero means the code is longer than 8 bits.
    lut: [u16; 1 << LUT_BITS],
}

impl HuffmanTable {
    /// Build a decode table from code length counts and the symbol list.
    pub fn new(counts: &[u8; MAX_CODE_LENGTH], symbols: &[u8]) -> Result<Self> {
        let n_codes: usize = counts.iter().map(|&n| n as usize).sum();
        if n_codes == 0 {
            return Err(JpegError::format("Huffman table has zero length"));
        }
        if n_codes > MAX_CODES {
            return Err(JpegError::format("Huffman table has excessive length"));
        }
        if symbols.len() != n_codes {
            return Err(JpegError::format(format!(
                "Huffman table declares {} codes but carries {} symbols",
                n_codes,
                symbols.len()
            )));
        }

        let mut table = HuffmanTable {
            n_codes,
            vals: symbols.to_vec(),
            min_code: [-1; MAX_CODE_LENGTH],
            max_code: [-1; MAX_CODE_LENGTH],
            vals_index: [-1; MAX_CODE_LENGTH],
            lut: [0; 1 << LUT_BITS],
        };

        let mut code: i32 = 0;
        let mut index: i32 = 0;
        for (i, &count) in counts.iter().enumerate() {
            let count = count as i32;
            if count > 0 {
                // Codes of this length must still fit in `i + 1` bits.
                if code + count > 1 << (i + 1) {
                    return Err(JpegError::format("bad Huffman table (code overflow)"));
                }
                table.min_code[i] = code;
                table.max_code[i] = code + count - 1;
                table.vals_index[i] = index;

                if i < LUT_BITS as usize {
                    let shift = LUT_BITS as usize - (i + 1);
                    for k in 0..count {
                        let symbol = table.vals[(index + k) as usize] as u16;
                        let base = ((code + k) as usize) << shift;
                        for slot in &mut table.lut[base..base + (1 << shift)] {
                            *slot = symbol << 8 | (i as u16 + 1);
                        }
                    }
                }

                code += count;
                index += count;
            }
            code <<= 1;
        }

        Ok(table)
    }

    /// Total number of codes in the table.
    #[inline]
    pub fn n_codes(&self) -> usize {
        self.n_codes
    }

    /// Smallest code of the given bit length (1..=16), -1 if there is none.
    #[inline]
    pub fn min_code(&self, length: usize) -> i32 {
        self.min_code[length - 1]
    }

    /// Largest code of the given bit length (1..=16), -1 if there is none.
    #[inline]
    pub fn max_code(&self, length: usize) -> i32 {
        self.max_code[length - 1]
    }

    /// Index into the symbol list of the smallest code of the given length, -1 if there is none.
    #[inline]
    pub fn vals_index(&self, length: usize) -> i32 {
        self.vals_index[length - 1]
    }

    /// Resolve a `length`-bit code, returning None if no code of that length matches.
    #[inline]
    pub fn lookup(&self, code: i32, length: usize) -> Option<u8> {
        let i = length - 1;
        if code <= self.max_code[i] && code >= self.min_code[i] {
            Some(self.vals[(self.vals_index[i] + code - self.min_code[i]) as usize])
        } else {
            None
        }
    }

    /// Fast path: resolve the code at the top of `peek` (8 bits).
    /// Returns (symbol, length) for codes of at most 8 bits.
    #[inline]
    pub(crate) fn lookup_fast(&self, peek: u8) -> Option<(u8, u32)> {
        match self.lut[peek as usize] {
            0 => None,
            v => Some(((v >> 8) as u8, (v & 0xFF) as u32)),
        }
    }
}

/// Compiled Huffman table for encoding.
///
/// Maps symbols to (code, length) pairs for O(1) encoding lookup.
#[derive(Debug, Clone)]
pub struct HuffmanEncoder {
    encode_map: [Option<(u16, u8)>; MAX_CODES],
}

impl HuffmanEncoder {
    /// Build the encoder lookup from a trusted specification.
    pub fn from_spec(spec: &HuffmanSpec) -> Self {
        let mut encode_map = [None; MAX_CODES];
        let mut code: u32 = 0;
        let mut k = 0;
        for (i, &count) in spec.counts.iter().enumerate() {
            for _ in 0..count {
                encode_map[spec.values[k] as usize] = Some((code as u16, i as u8 + 1));
                code += 1;
                k += 1;
            }
            code <<= 1;
        }
        HuffmanEncoder { encode_map }
    }

    /// Get code and length for a symbol.
    #[inline]
    pub fn encode(&self, symbol: u8) -> Option<(u16, u8)> {
        self.encode_map[symbol as usize]
    }
}

/// Compute the magnitude category and value bits for a coefficient.
///
/// Returns (size, bits): `size` is the minimal bit count of `|value|` (0 for
/// 0), `bits` is `value` for positive values and `value - 1` truncated to
/// `size` bits for negative ones. This is the inverse of `receive_extend`.
#[inline]
pub fn encode_coefficient(value: i32) -> (u8, u32) {
    if value == 0 {
        return (0, 0);
    }

    let magnitude = value.unsigned_abs();
    let size = 32 - magnitude.leading_zeros();
    let mask = ((1u64 << size) - 1) as u32;
    let bits = if value < 0 {
        (value.wrapping_sub(1) as u32) & mask
    } else {
        magnitude
    };

    (size as u8, bits)
}
