//! Bit-level access to entropy-coded segments.
//!
//! [`BitReader`] pulls bits out of a byte-stuffed stream one byte at a time,
//! so it never reads past the data it needs and the caller can pick up the
//! next marker straight from the underlying reader. [`BitWriter`] is the
//! inverse and inserts a `0x00` after every `0xFF` it produces.

use std::io::{self, Read};

use crate::error::{JpegError, Result};
use crate::huffman::{HuffmanEncoder, HuffmanTable, LUT_BITS, MAX_CODE_LENGTH};

/// Read one raw byte, treating a short read as malformed entropy data.
fn read_raw<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(buf[0]),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(JpegError::format(
            "unexpected end of entropy-coded data",
        )),
        Err(e) => Err(e.into()),
    }
}

/// Bit reader for entropy-coded data.
///
/// The `n` least significant bits of `a` are the unread bits, read MSB
/// first. `m` is `1 << (n - 1)` when `n > 0` and 0 otherwise.
pub struct BitReader<'r, R> {
    reader: &'r mut R,
    /// Accumulator.
    a: u32,
    /// One-hot mask of the next bit to test.
    m: u32,
    /// Number of unread bits in `a`.
    n: u32,
}

impl<'r, R: Read> BitReader<'r, R> {
    /// Create a new bit reader on top of `reader`.
    pub fn new(reader: &'r mut R) -> Self {
        BitReader {
            reader,
            a: 0,
            m: 0,
            n: 0,
        }
    }

    /// Number of bits currently buffered.
    #[inline]
    pub fn bits_available(&self) -> u32 {
        self.n
    }

    /// Read one byte of entropy-coded data, reconstituting `0xFF00` as `0xFF`.
    fn read_stuffed_byte(&mut self) -> Result<u8> {
        let x = read_raw(self.reader)?;
        if x != 0xFF {
            return Ok(x);
        }
        if read_raw(self.reader)? != 0x00 {
            return Err(JpegError::format("missing 0xFF00 sequence"));
        }
        Ok(0xFF)
    }

    /// Refill the accumulator until at least `k` bits are buffered.
    pub fn ensure_n_bits(&mut self, k: u32) -> Result<()> {
        while self.n < k {
            let c = self.read_stuffed_byte()?;
            self.a = self.a << 8 | c as u32;
            self.n += 8;
            self.m = if self.m == 0 { 1 << 7 } else { self.m << 8 };
        }
        Ok(())
    }

    /// Consume and return the next `k` bits (at most 16) as an unsigned value.
    pub fn decode_bits(&mut self, k: u32) -> Result<u32> {
        debug_assert!(k <= 16);
        if self.n < k {
            self.ensure_n_bits(k)?;
        }
        let value = (self.a >> (self.n - k)) & ((1 << k) - 1);
        self.n -= k;
        self.m >>= k;
        Ok(value)
    }

    /// Consume and return a single bit.
    pub fn decode_bit(&mut self) -> Result<bool> {
        if self.n == 0 {
            self.ensure_n_bits(1)?;
        }
        let bit = self.a & self.m != 0;
        self.n -= 1;
        self.m >>= 1;
        Ok(bit)
    }

    /// Read `t` bits and sign-extend them (ITU T.81 Figure F.12).
    pub fn receive_extend(&mut self, t: u8) -> Result<i32> {
        if t == 0 {
            return Ok(0);
        }
        let t = t as u32;
        let s: i32 = 1 << t;
        let mut x = self.decode_bits(t)? as i32;
        if x < s >> 1 {
            x += (-1 << t) + 1;
        }
        Ok(x)
    }

    /// Decode one Huffman symbol.
    ///
    /// Codes of up to 8 bits are resolved through the table's look-up table,
    /// but only from bits already buffered. Everything else walks the code one
    /// bit at a time against the per-length ranges.
    pub fn decode_huffman(&mut self, table: &HuffmanTable) -> Result<u8> {
        if table.n_codes() == 0 {
            return Err(JpegError::format("uninitialized Huffman table"));
        }

        if self.n >= LUT_BITS {
            let peek = (self.a >> (self.n - LUT_BITS)) as u8;
            if let Some((symbol, length)) = table.lookup_fast(peek) {
                self.n -= length;
                self.m >>= length;
                return Ok(symbol);
            }
        }

        let mut code: i32 = 0;
        for length in 1..=MAX_CODE_LENGTH {
            if self.decode_bit()? {
                code |= 1;
            }
            if let Some(symbol) = table.lookup(code, length) {
                return Ok(symbol);
            }
            code <<= 1;
        }
        Err(JpegError::format("bad Huffman code"))
    }

    /// Drop all buffered bits.
    pub fn reset(&mut self) {
        self.a = 0;
        self.m = 0;
        self.n = 0;
    }

    /// Expect `0xFF RSTn` on the raw stream, then clear the accumulator.
    pub fn read_restart_marker(&mut self, expected: u8) -> Result<()> {
        let b0 = read_raw(self.reader)?;
        let b1 = read_raw(self.reader)?;
        if b0 != 0xFF || b1 != expected {
            return Err(JpegError::format(format!(
                "bad RST marker: expected FF{:02X}, found {:02X}{:02X}",
                expected, b0, b1
            )));
        }
        self.reset();
        Ok(())
    }
}

/// Bit writer for entropy-coded data.
///
/// Handles byte stuffing (0xFF → 0xFF 0x00) and padding to a byte boundary.
pub struct BitWriter {
    data: Vec<u8>,
    /// Bit accumulator, valid bits right aligned.
    bits: u32,
    num_bits: u32,
}

impl BitWriter {
    /// Create a new bit writer.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new bit writer with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        BitWriter {
            data: Vec::with_capacity(capacity),
            bits: 0,
            num_bits: 0,
        }
    }

    /// Write the low `count` bits of `value` (at most 16), MSB first.
    #[inline]
    pub fn emit(&mut self, value: u32, count: u32) {
        debug_assert!(count <= 16);
        if count == 0 {
            return;
        }
        self.bits = self.bits << count | (value & ((1 << count) - 1));
        self.num_bits += count;

        while self.num_bits >= 8 {
            self.num_bits -= 8;
            let byte = (self.bits >> self.num_bits) as u8;
            self.write_byte(byte);
        }
        self.bits &= (1 << self.num_bits) - 1;
    }

    /// Write a Huffman-coded symbol.
    #[inline]
    pub fn emit_huffman(&mut self, symbol: u8, table: &HuffmanEncoder) -> Result<()> {
        let (code, length) = table.encode(symbol).ok_or_else(|| {
            JpegError::unsupported(format!("symbol 0x{:02X} not in Huffman table", symbol))
        })?;
        self.emit(code as u32, length as u32);
        Ok(())
    }

    /// Append raw bytes (e.g. a restart marker). Pending bits are flushed first.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.flush();
        self.data.extend_from_slice(bytes);
    }

    fn write_byte(&mut self, byte: u8) {
        self.data.push(byte);
        if byte == 0xFF {
            self.data.push(0x00);
        }
    }

    /// Pad to a byte boundary with 1 bits.
    pub fn flush(&mut self) {
        if self.num_bits > 0 {
            let padding = 8 - self.num_bits;
            self.emit((1 << padding) - 1, padding);
        }
    }

    /// Flush and return the written bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.data
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::huffman::HuffmanSpec;
    use crate::tables::FIXED_HUFFMAN_SPECS;
    use std::io::Cursor;

    #[test]
    fn test_decode_bits() {
        let mut cursor = Cursor::new(vec![0b1011_0100, 0b1100_1010]);
        let mut reader = BitReader::new(&mut cursor);

        assert_eq!(reader.decode_bits(4).unwrap(), 0b1011);
        assert_eq!(reader.decode_bits(4).unwrap(), 0b0100);
        assert_eq!(reader.decode_bits(8).unwrap(), 0b1100_1010);
        assert_eq!(reader.bits_available(), 0);
    }

    #[test]
    fn test_reader_does_not_read_ahead() {
        let mut cursor = Cursor::new(vec![0xA5, 0x11, 0x22]);
        {
            let mut reader = BitReader::new(&mut cursor);
            assert_eq!(reader.decode_bits(3).unwrap(), 0b101);
        }
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_stuffed_byte() {
        let mut cursor = Cursor::new(vec![0xFF, 0x00, 0x12]);
        let mut reader = BitReader::new(&mut cursor);

        assert_eq!(reader.decode_bits(8).unwrap(), 0xFF);
        assert_eq!(reader.decode_bits(8).unwrap(), 0x12);
    }

    #[test]
    fn test_missing_stuffing_rejected() {
        let mut cursor = Cursor::new(vec![0xFF, 0xD9]);
        let mut reader = BitReader::new(&mut cursor);

        let err = reader.decode_bits(8).unwrap_err();
        assert!(err.to_string().contains("missing 0xFF00 sequence"));
    }

    #[test]
    fn test_end_of_data_is_format_error() {
        let mut cursor = Cursor::new(vec![0x12]);
        let mut reader = BitReader::new(&mut cursor);

        reader.decode_bits(8).unwrap();
        assert!(matches!(
            reader.decode_bit(),
            Err(JpegError::Format { .. })
        ));
    }

    #[test]
    fn test_receive_extend() {
        // Bits from MSB: 1 | 0 | 01 | 11 | 00
        let mut cursor = Cursor::new(vec![0b1001_1100, 0x00]);
        let mut reader = BitReader::new(&mut cursor);

        assert_eq!(reader.receive_extend(1).unwrap(), 1);
        assert_eq!(reader.receive_extend(1).unwrap(), -1);
        assert_eq!(reader.receive_extend(2).unwrap(), -2);
        assert_eq!(reader.receive_extend(2).unwrap(), 3);
        assert_eq!(reader.receive_extend(0).unwrap(), 0);
    }

    #[test]
    fn test_decode_huffman_short_and_long_codes() {
        let spec = FIXED_HUFFMAN_SPECS[1];
        let table = HuffmanTable::new(&spec.counts, spec.values).unwrap();
        let encoder = HuffmanEncoder::from_spec(&spec);

        let symbols = [0x01, 0xFA, 0x00, 0xF0, 0x83, 0x11];
        let mut writer = BitWriter::new();
        for &s in &symbols {
            writer.emit_huffman(s, &encoder).unwrap();
        }
        let mut cursor = Cursor::new(writer.into_bytes());
        let mut reader = BitReader::new(&mut cursor);
        for &s in &symbols {
            assert_eq!(reader.decode_huffman(&table).unwrap(), s);
        }
    }

    #[test]
    fn test_bad_huffman_code() {
        // A table with a single 1-bit code "0": 16 one bits never match.
        let mut counts = [0u8; 16];
        counts[0] = 1;
        let table = HuffmanTable::new(&counts, &[7]).unwrap();
        let mut cursor = Cursor::new(vec![0xFF, 0x00, 0xFF, 0x00, 0xFF, 0x00]);
        let mut reader = BitReader::new(&mut cursor);

        let err = reader.decode_huffman(&table).unwrap_err();
        assert!(err.to_string().contains("bad Huffman code"));
    }

    #[test]
    fn test_restart_marker() {
        let mut cursor = Cursor::new(vec![0b1010_0000, 0xFF, 0xD0, 0b1000_0000]);
        let mut reader = BitReader::new(&mut cursor);

        assert_eq!(reader.decode_bits(3).unwrap(), 0b101);
        reader.read_restart_marker(0xD0).unwrap();
        assert_eq!(reader.bits_available(), 0);
        assert!(reader.decode_bit().unwrap());
    }

    #[test]
    fn test_wrong_restart_marker() {
        let mut cursor = Cursor::new(vec![0xFF, 0xD1]);
        let mut reader = BitReader::new(&mut cursor);

        let err = reader.read_restart_marker(0xD0).unwrap_err();
        assert!(err.to_string().contains("bad RST marker"));
    }

    #[test]
    fn test_writer_basic() {
        let mut writer = BitWriter::new();
        writer.emit(0b1011, 4);
        writer.emit(0b0100, 4);
        assert_eq!(writer.into_bytes(), vec![0b1011_0100]);
    }

    #[test]
    fn test_writer_byte_stuffing() {
        let mut writer = BitWriter::new();
        writer.emit(0xFF, 8);
        writer.emit(0x12, 8);
        assert_eq!(writer.into_bytes(), vec![0xFF, 0x00, 0x12]);
    }

    #[test]
    fn test_writer_padding() {
        let mut writer = BitWriter::new();
        writer.emit(0b10110, 5);
        assert_eq!(writer.into_bytes(), vec![0b1011_0111]);
    }

    #[test]
    fn test_writer_padding_can_stuff() {
        let mut writer = BitWriter::new();
        writer.emit(0b1, 1);
        assert_eq!(writer.into_bytes(), vec![0xFF, 0x00]);
    }

    #[test]
    fn test_writer_raw_flushes_first() {
        let mut writer = BitWriter::new();
        writer.emit(0b0, 1);
        writer.write_raw(&[0xFF, 0xD0]);
        assert_eq!(writer.into_bytes(), vec![0x7F, 0xFF, 0xD0]);
    }

    #[test]
    fn test_unknown_symbol_is_error() {
        let spec = HuffmanSpec {
            counts: [0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            values: &[3],
        };
        let encoder = HuffmanEncoder::from_spec(&spec);
        let mut writer = BitWriter::new();
        assert!(writer.emit_huffman(4, &encoder).is_err());
    }
}
