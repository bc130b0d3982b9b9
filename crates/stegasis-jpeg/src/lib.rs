//! Baseline JPEG coefficient codec
//!
//! Decodes a baseline (SOF0) JPEG down to its quantized DCT coefficients,
//! lets the caller read and overwrite them by linear index and writes the
//! result back as a valid JPEG. There is no IDCT, no color conversion and no
//! quantization: coefficients are an opaque payload that must survive a
//! decode/encode cycle unchanged.
//!
//! # Architecture
//!
//! ```text
//! bytes → markers → Huffman decode → [Block] → get/set → Huffman encode → bytes
//! ```
//!
//! Decoding accepts any 3-component, 8-bit baseline image with interleaved
//! scans and optional restart intervals. Encoding always uses the reference
//! Huffman tables and writes 4:2:0 only.
//!
//! # Example
//!
//! ```no_run
//! use stegasis_jpeg::Jpeg;
//!
//! let mut jpeg = Jpeg::open("frame.jpeg")?;
//! let first = jpeg.get(1)?;
//! jpeg.set(1, first ^ 1)?;
//! if jpeg.is_dirty() {
//!     jpeg.encode()?;
//! }
//! # Ok::<(), stegasis_jpeg::JpegError>(())
//! ```

pub mod bits;
mod error;
pub mod huffman;
mod image;
pub mod marker;
mod parser;
mod scan;
pub mod tables;
mod writer;

pub use bits::{BitReader, BitWriter};
pub use error::{JpegError, Result};
pub use huffman::{encode_coefficient, HuffmanEncoder, HuffmanSpec, HuffmanTable};
pub use image::{Block, Component, Jpeg, QuantizationTable};
pub use marker::Marker;
pub use tables::{
    fixed_encoder, fixed_encoders, HuffmanIndex, BLOCK_SIZE, FIXED_HUFFMAN_SPECS, SAMPLING_420,
    SOS_HEADER_YCBCR, ZIGZAG_TO_NATURAL,
};
