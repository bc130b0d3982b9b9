//! The decoded image: an addressable store of DCT coefficients.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{JpegError, Result};
use crate::tables::{BLOCK_SIZE, SAMPLING_420};
use crate::{parser, writer};

/// One 8x8 block of coefficients in natural (row-major) order. Index 0 is DC.
pub type Block = [i32; BLOCK_SIZE];

/// Frame component specification (ITU T.81 section B.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Component identifier.
    pub id: u8,
    /// Horizontal sampling factor (1-4).
    pub h: u8,
    /// Vertical sampling factor (1-4).
    pub v: u8,
    /// Quantization table destination selector.
    pub tq: u8,
}

impl Component {
    /// Number of blocks this component contributes to each MCU.
    #[inline]
    pub fn blocks_per_mcu(&self) -> usize {
        self.h as usize * self.v as usize
    }
}

/// A quantization table as read from a DQT segment.
///
/// The codec never (de)quantizes; coefficients pass through untouched. The
/// table is kept for inspection only. 16-bit entries keep their high byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizationTable {
    /// Precision: 0 = 8-bit, 1 = 16-bit.
    pub precision: u8,
    /// Table values in zigzag order (as stored in JPEG).
    pub values: [u8; BLOCK_SIZE],
}

/// A baseline JPEG image decoded down to its quantized DCT coefficients.
///
/// Coefficients are addressed linearly: coefficient `i` is entry `i % 64` of
/// block `i / 64`, blocks in MCU traversal order. Any write marks the image
/// dirty until it is encoded again.
#[derive(Debug, Clone)]
pub struct Jpeg {
    pub(crate) path: Option<PathBuf>,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) restart_interval: u16,
    pub(crate) components: [Component; 3],
    pub(crate) quant: [Option<QuantizationTable>; 4],
    pub(crate) blocks: Vec<Block>,
    pub(crate) component_index: Vec<u8>,
    pub(crate) dirty: bool,
}

impl Jpeg {
    /// Decode an image held in memory.
    pub fn decode(data: &[u8]) -> Result<Jpeg> {
        let mut cursor = std::io::Cursor::new(data);
        parser::decode(&mut cursor)
    }

    /// Decode an image from a reader. Reading stops right after EOI.
    ///
    /// Entropy-coded data is pulled one byte at a time, so hand in a
    /// [`std::io::BufReader`] rather than a bare `File` or socket.
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use std::io::BufReader;
    ///
    /// let mut reader = BufReader::new(File::open("frame.jpeg")?);
    /// let jpeg = stegasis_jpeg::Jpeg::decode_reader(&mut reader)?;
    /// # Ok::<(), stegasis_jpeg::JpegError>(())
    /// ```
    pub fn decode_reader<R: Read>(reader: &mut R) -> Result<Jpeg> {
        parser::decode(reader)
    }

    /// Decode the file at `path` and remember it as the encode target.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Jpeg> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let mut jpeg = Self::decode(&data)?;
        jpeg.path = Some(path.to_path_buf());
        Ok(jpeg)
    }

    /// An all-zero 4:2:0 image of the given dimensions, in the layout the
    /// encoder writes.
    pub fn blank(width: u16, height: u16) -> Result<Jpeg> {
        if width == 0 || height == 0 {
            return Err(JpegError::unsupported("zero image dimension"));
        }
        let mcu_cols = (width as usize).div_ceil(16);
        let mcu_rows = (height as usize).div_ceil(16);
        let mut component_index = Vec::with_capacity(mcu_cols * mcu_rows * 6);
        for _ in 0..mcu_cols * mcu_rows {
            component_index.extend_from_slice(&[0, 0, 0, 0, 1, 2]);
        }

        let components = [0usize, 1, 2].map(|i| Component {
            id: i as u8 + 1,
            h: SAMPLING_420[i].0,
            v: SAMPLING_420[i].1,
            tq: 0,
        });

        Ok(Jpeg {
            path: None,
            width,
            height,
            restart_interval: 0,
            components,
            quant: [None, None, None, None],
            blocks: vec![[0; BLOCK_SIZE]; component_index.len()],
            component_index,
            dirty: false,
        })
    }

    /// Use `path` as the target of [`Jpeg::encode`].
    pub fn with_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    /// File this image was decoded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Image width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Restart interval in MCUs, 0 when disabled.
    pub fn restart_interval(&self) -> u16 {
        self.restart_interval
    }

    /// The three frame components, in SOF order.
    pub fn components(&self) -> &[Component; 3] {
        &self.components
    }

    /// Quantization table stored at destination `id` (0-3).
    pub fn quantization_table(&self, id: usize) -> Option<&QuantizationTable> {
        self.quant.get(id).and_then(Option::as_ref)
    }

    /// Decoded blocks in MCU traversal order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Index (0-2) of the component block `block` belongs to.
    pub fn block_component(&self, block: usize) -> Option<u8> {
        self.component_index.get(block).copied()
    }

    /// Total number of coefficients: 64 per block.
    #[inline]
    pub fn size(&self) -> usize {
        self.blocks.len() * BLOCK_SIZE
    }

    /// Read coefficient `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Result<i32> {
        self.check_bounds(i)?;
        Ok(self.blocks[i / BLOCK_SIZE][i % BLOCK_SIZE])
    }

    /// Overwrite coefficient `i` and mark the image dirty.
    #[inline]
    pub fn set(&mut self, i: usize, value: i32) -> Result<()> {
        self.check_bounds(i)?;
        self.blocks[i / BLOCK_SIZE][i % BLOCK_SIZE] = value;
        self.dirty = true;
        Ok(())
    }

    /// True once any coefficient was written since decode or the last encode.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn check_bounds(&self, i: usize) -> Result<()> {
        if i >= self.size() {
            return Err(JpegError::OutOfBounds {
                index: i,
                size: self.size(),
            });
        }
        Ok(())
    }

    /// Serialize the coefficients as a new baseline JPEG.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::write_jpeg(self)
    }

    /// Serialize the coefficients into `w`.
    pub fn encode_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        w.write_all(&bytes)?;
        w.flush()?;
        Ok(())
    }

    /// Overwrite the source file with the current coefficients and clear the
    /// dirty flag. Does nothing while the image is clean.
    pub fn encode(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let path = self.path.as_ref().ok_or(JpegError::NoPath)?;
        // Serialize before truncating so a failed encode leaves the file intact.
        let bytes = self.to_bytes()?;
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(&bytes)?;
        out.flush()?;
        self.dirty = false;
        Ok(())
    }
}
