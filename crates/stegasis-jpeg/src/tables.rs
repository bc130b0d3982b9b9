//! Constant tables shared by the decoder and the encoder.

use std::sync::OnceLock;

use crate::huffman::{HuffmanEncoder, HuffmanSpec};

/// Number of coefficients in an 8x8 block.
pub const BLOCK_SIZE: usize = 64;

/// Zigzag order to natural (row-major) order mapping.
///
/// `ZIGZAG_TO_NATURAL[3]` is 16: the fourth coefficient in zigzag order sits
/// in the first column (16 % 8) of the third row (16 / 8).
pub const ZIGZAG_TO_NATURAL: [usize; BLOCK_SIZE] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Sampling factors (h, v) the encoder writes for Y, Cb and Cr.
///
/// This codec always emits 4:2:0 and visits the four luma blocks of an MCU
/// as 0 1 / 2 3 followed by one Cb and one Cr block. Nothing in the stream
/// signals that order, so decode and encode both hard code it.
pub const SAMPLING_420: [(u8, u8); 3] = [(2, 2), (1, 1), (1, 1)];

/// Index into [`FIXED_HUFFMAN_SPECS`] and [`fixed_encoders`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HuffmanIndex {
    LuminanceDc = 0,
    LuminanceAc = 1,
    ChrominanceDc = 2,
    ChrominanceAc = 3,
}

impl HuffmanIndex {
    /// The `Tc << 4 | Th` byte this table carries in the DHT segment.
    pub fn class_and_destination(self) -> u8 {
        match self {
            HuffmanIndex::LuminanceDc => 0x00,
            HuffmanIndex::LuminanceAc => 0x10,
            HuffmanIndex::ChrominanceDc => 0x01,
            HuffmanIndex::ChrominanceAc => 0x11,
        }
    }
}

/// The baseline reference Huffman tables (ITU T.81 Annex K.3).
/// The encoder uses them for every image regardless of what was decoded.
pub const FIXED_HUFFMAN_SPECS: [HuffmanSpec; 4] = [
    // Luminance DC.
    HuffmanSpec {
        counts: [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
        values: &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    },
    // Luminance AC.
    HuffmanSpec {
        counts: [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 125],
        values: &[
            0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51,
            0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08, 0x23, 0x42, 0xb1, 0xc1,
            0x15, 0x52, 0xd1, 0xf0, 0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16, 0x17, 0x18,
            0x19, 0x1a, 0x25, 0x26, 0x27, 0x28, 0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
            0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57,
            0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6a, 0x73, 0x74, 0x75,
            0x76, 0x77, 0x78, 0x79, 0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, 0x8a, 0x92,
            0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7,
            0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3,
            0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8,
            0xd9, 0xda, 0xe1, 0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf1, 0xf2,
            0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa,
        ],
    },
    // Chrominance DC.
    HuffmanSpec {
        counts: [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0],
        values: &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    },
    // Chrominance AC.
    HuffmanSpec {
        counts: [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 119],
        values: &[
            0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, 0x31, 0x06, 0x12, 0x41, 0x51, 0x07,
            0x61, 0x71, 0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, 0xa1, 0xb1, 0xc1, 0x09,
            0x23, 0x33, 0x52, 0xf0, 0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34, 0xe1, 0x25,
            0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26, 0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38,
            0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4a, 0x53, 0x54, 0x55, 0x56,
            0x57, 0x58, 0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6a, 0x73, 0x74,
            0x75, 0x76, 0x77, 0x78, 0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
            0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5,
            0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba,
            0xc2, 0xc3, 0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, 0xd5, 0xd6,
            0xd7, 0xd8, 0xd9, 0xda, 0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, 0xf2,
            0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8, 0xf9, 0xfa,
        ],
    },
];

/// The SOS header the encoder writes: three components, Y on tables 0/0,
/// Cb and Cr on tables 1/1, then Ss=0, Se=63, Ah/Al=0.
pub const SOS_HEADER_YCBCR: [u8; 14] = [
    0xFF, 0xDA, 0x00, 0x0C, 0x03, 0x01, 0x00, 0x02, 0x11, 0x03, 0x11, 0x00, 0x3F, 0x00,
];

/// Encoder lookups for [`FIXED_HUFFMAN_SPECS`], built once on first use.
pub fn fixed_encoders() -> &'static [HuffmanEncoder; 4] {
    static ENCODERS: OnceLock<[HuffmanEncoder; 4]> = OnceLock::new();
    ENCODERS.get_or_init(|| FIXED_HUFFMAN_SPECS.map(|spec| HuffmanEncoder::from_spec(&spec)))
}

/// Encoder lookup for one of the fixed tables.
pub fn fixed_encoder(index: HuffmanIndex) -> &'static HuffmanEncoder {
    &fixed_encoders()[index as usize]
}
