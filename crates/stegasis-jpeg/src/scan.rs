//! Sequential scan decoding and encoding.
//!
//! The decoder walks the MCU grid of an interleaved baseline scan and stores
//! every block in natural order. The encoder is the inverse for one block at
//! a time; [`crate::writer`] drives it over the whole image.

use std::io::Read;

use crate::bits::{BitReader, BitWriter};
use crate::error::{JpegError, Result};
use crate::huffman::{encode_coefficient, HuffmanEncoder, HuffmanTable};
use crate::image::{Block, Component};
use crate::marker::Marker;
use crate::parser::FrameHeader;
use crate::tables::{BLOCK_SIZE, ZIGZAG_TO_NATURAL};

/// One component of a scan with the tables selected for it.
pub(crate) struct ScanComponent<'t> {
    /// Index into the frame components.
    pub index: usize,
    pub dc: &'t HuffmanTable,
    pub ac: &'t HuffmanTable,
}

/// Blocks of a decoded scan, in MCU traversal order.
#[derive(Debug, Default)]
pub(crate) struct DecodedScan {
    pub blocks: Vec<Block>,
    pub component_index: Vec<u8>,
}

impl DecodedScan {
    fn reserve(&mut self, additional: usize) {
        self.blocks.reserve(additional);
        self.component_index.reserve(additional);
    }

    fn push(&mut self, block: Block, component: usize) {
        self.blocks.push(block);
        self.component_index.push(component as u8);
    }
}

/// Number of MCU columns and rows for an image, from the luma sampling factors.
pub(crate) fn mcu_grid(width: u16, height: u16, luma: &Component) -> (usize, usize) {
    let mcu_width = 8 * luma.h as usize;
    let mcu_height = 8 * luma.v as usize;
    (
        (width as usize).div_ceil(mcu_width),
        (height as usize).div_ceil(mcu_height),
    )
}

/// Number of blocks per row and column a single component covers.
///
/// The component's own size is the image size scaled by its sampling
/// factors relative to the largest ones in the frame (ITU T.81 A.1.1).
pub(crate) fn component_blocks(frame: &FrameHeader, component: &Component) -> (usize, usize) {
    let h_max = frame.components.iter().map(|c| c.h).max().unwrap_or(1) as usize;
    let v_max = frame.components.iter().map(|c| c.v).max().unwrap_or(1) as usize;
    let width = (frame.width as usize * component.h as usize).div_ceil(h_max);
    let height = (frame.height as usize * component.v as usize).div_ceil(v_max);
    (width.div_ceil(8), height.div_ceil(8))
}

/// Restart marker bookkeeping for one scan.
struct Restarts {
    interval: usize,
    total_mcus: usize,
    mcu: usize,
    next: Marker,
}

impl Restarts {
    fn new(interval: u16, total_mcus: usize) -> Self {
        Restarts {
            interval: interval as usize,
            total_mcus,
            mcu: 0,
            next: Marker::RST(0),
        }
    }

    /// Count a finished MCU and consume the restart marker following it, if
    /// one is due. No marker follows the last MCU.
    fn finish_mcu<R: Read>(
        &mut self,
        bits: &mut BitReader<'_, R>,
        dc_predictors: &mut [i32; 3],
        eob_run: &mut u32,
    ) -> Result<()> {
        self.mcu += 1;
        if self.interval == 0 || self.mcu % self.interval != 0 || self.mcu >= self.total_mcus {
            return Ok(());
        }

        bits.read_restart_marker(self.next.to_u8())?;
        log::trace!("{:?} after MCU {}", self.next, self.mcu);
        self.next = match self.next {
            Marker::RST(n) => Marker::RST((n + 1) & 0x07),
            other => other,
        };
        *dc_predictors = [0; 3];
        *eob_run = 0;
        Ok(())
    }
}

/// Decode the entropy-coded data that follows an SOS header and append the
/// blocks to `decoded`.
///
/// In an interleaved scan (two or three components) the blocks of a
/// component with `h * v` blocks per MCU are decoded in raster order inside
/// the MCU, so the four luma blocks of a 4:2:0 MCU come out as
///
/// ```text
///  0 1
///  2 3
/// ```
///
/// A scan with a single component is not interleaved: every block is its own
/// MCU and the blocks are visited in raster order over the component, with
/// no data for blocks that lie entirely outside the image.
///
/// DC values are stored as absolute values, not deltas.
pub(crate) fn decode_scan<R: Read>(
    reader: &mut R,
    frame: &FrameHeader,
    restart_interval: u16,
    scan: &[ScanComponent<'_>],
    decoded: &mut DecodedScan,
) -> Result<()> {
    let mut bits = BitReader::new(reader);
    let mut dc_predictors = [0i32; 3];
    let mut eob_run = 0u32;

    if let [single] = scan {
        let (cols, rows) = component_blocks(frame, &frame.components[single.index]);
        let total = cols * rows;
        decoded.reserve(total);
        let mut restarts = Restarts::new(restart_interval, total);

        for _ in 0..total {
            let block = decode_block(
                &mut bits,
                single.dc,
                single.ac,
                &mut dc_predictors[single.index],
                &mut eob_run,
            )?;
            decoded.push(block, single.index);
            restarts.finish_mcu(&mut bits, &mut dc_predictors, &mut eob_run)?;
        }
        return Ok(());
    }

    let (mcu_cols, mcu_rows) = mcu_grid(frame.width, frame.height, &frame.components[0]);
    let total_mcus = mcu_cols * mcu_rows;
    let blocks_per_mcu: usize = scan
        .iter()
        .map(|sc| frame.components[sc.index].blocks_per_mcu())
        .sum();
    decoded.reserve(total_mcus * blocks_per_mcu);
    let mut restarts = Restarts::new(restart_interval, total_mcus);

    for _ in 0..total_mcus {
        for sc in scan {
            for _ in 0..frame.components[sc.index].blocks_per_mcu() {
                let block = decode_block(
                    &mut bits,
                    sc.dc,
                    sc.ac,
                    &mut dc_predictors[sc.index],
                    &mut eob_run,
                )?;
                decoded.push(block, sc.index);
            }
        }
        restarts.finish_mcu(&mut bits, &mut dc_predictors, &mut eob_run)?;
    }

    Ok(())
}

/// Decode a single 8x8 block of DCT coefficients.
///
/// `eob_run` carries end-of-band runs across blocks: while it is non-zero the
/// block has a DC term only.
pub(crate) fn decode_block<R: Read>(
    reader: &mut BitReader<'_, R>,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    dc_predictor: &mut i32,
    eob_run: &mut u32,
) -> Result<Block> {
    let mut block = [0i32; BLOCK_SIZE];

    let dc_size = reader.decode_huffman(dc_table)?;
    if dc_size > 16 {
        return Err(JpegError::format("excessive DC component"));
    }
    let dc_diff = reader.receive_extend(dc_size)?;
    *dc_predictor = dc_predictor.wrapping_add(dc_diff);
    block[0] = *dc_predictor;

    if *eob_run > 0 {
        *eob_run -= 1;
        return Ok(block);
    }

    let mut k = 1;
    while k < BLOCK_SIZE {
        let symbol = reader.decode_huffman(ac_table)?;
        let run = symbol >> 4;
        let size = symbol & 0x0F;

        if size != 0 {
            k += run as usize;
            if k >= BLOCK_SIZE {
                return Err(JpegError::format("AC coefficient index out of bounds"));
            }
            block[ZIGZAG_TO_NATURAL[k]] = reader.receive_extend(size)?;
            k += 1;
        } else if run == 0x0F {
            // ZRL
            k += 16;
        } else {
            // EOB, or EOBn covering this and the following blocks.
            let mut run_length = 1u32 << run;
            if run > 0 {
                run_length |= reader.decode_bits(run as u32)?;
            }
            *eob_run = run_length - 1;
            break;
        }
    }

    Ok(block)
}

/// Encode a single 8x8 block, DC as a delta from `dc_predictor`.
pub(crate) fn encode_block(
    writer: &mut BitWriter,
    block: &Block,
    dc_encoder: &HuffmanEncoder,
    ac_encoder: &HuffmanEncoder,
    dc_predictor: &mut i32,
) -> Result<()> {
    let dc_value = block[0];
    let dc_diff = dc_value.wrapping_sub(*dc_predictor);
    *dc_predictor = dc_value;
    emit_huff_rle(writer, dc_encoder, 0, dc_diff)?;

    let mut zero_run = 0u8;
    for &natural in &ZIGZAG_TO_NATURAL[1..] {
        let coeff = block[natural];
        if coeff == 0 {
            zero_run += 1;
            continue;
        }
        while zero_run >= 16 {
            writer.emit_huffman(0xF0, ac_encoder)?;
            zero_run -= 16;
        }
        emit_huff_rle(writer, ac_encoder, zero_run, coeff)?;
        zero_run = 0;
    }

    if zero_run > 0 {
        writer.emit_huffman(0x00, ac_encoder)?;
    }
    Ok(())
}

/// Emit `(run << 4 | size)` through `encoder` followed by the `size` value bits.
fn emit_huff_rle(
    writer: &mut BitWriter,
    encoder: &HuffmanEncoder,
    run: u8,
    value: i32,
) -> Result<()> {
    let (size, bits) = encode_coefficient(value);
    if size > 15 {
        return Err(JpegError::unsupported(format!(
            "coefficient {} too large for baseline Huffman tables",
            value
        )));
    }
    writer.emit_huffman(run << 4 | size, encoder)?;
    writer.emit(bits, size as u32);
    log::trace!("run={}, value={}, size={}", run, value, size);
    Ok(())
}
