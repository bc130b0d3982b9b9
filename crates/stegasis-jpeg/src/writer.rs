//! JPEG file writer for the coefficient store.
//!
//! The output always has the same shape: SOI, one DQT of all ones, SOF0 with
//! 4:2:0 sampling, one DHT carrying the four fixed tables, the fixed SOS
//! header, the entropy-coded blocks and EOI. The source's own tables are not
//! reused.

use crate::bits::BitWriter;
use crate::error::{JpegError, Result};
use crate::image::Jpeg;
use crate::marker::Marker;
use crate::scan::encode_block;
use crate::tables::{
    fixed_encoders, HuffmanIndex, BLOCK_SIZE, FIXED_HUFFMAN_SPECS, SAMPLING_420, SOS_HEADER_YCBCR,
};

/// Component order of one 4:2:0 MCU.
const MCU_LAYOUT_420: [u8; 6] = [0, 0, 0, 0, 1, 2];

const DHT_TABLES: [HuffmanIndex; 4] = [
    HuffmanIndex::LuminanceDc,
    HuffmanIndex::LuminanceAc,
    HuffmanIndex::ChrominanceDc,
    HuffmanIndex::ChrominanceAc,
];

/// Serialize `jpeg` as a complete baseline JPEG file.
pub(crate) fn write_jpeg(jpeg: &Jpeg) -> Result<Vec<u8>> {
    check_layout(jpeg)?;

    let mut output = Vec::with_capacity(jpeg.blocks.len() * 24 + 1024);

    write_marker(&mut output, Marker::SOI);
    write_dqt(&mut output);
    write_sof0(&mut output, jpeg.width, jpeg.height);
    write_dht(&mut output);
    output.extend_from_slice(&SOS_HEADER_YCBCR);

    let scan_data = encode_scan(jpeg)?;
    output.extend_from_slice(&scan_data);

    write_marker(&mut output, Marker::EOI);

    log::debug!(
        "encoded {}x{} image: {} blocks, {} bytes",
        jpeg.width,
        jpeg.height,
        jpeg.blocks.len(),
        output.len()
    );
    Ok(output)
}

/// The encoder only knows the 4:2:0 layout. Blocks must come as Y Y Y Y Cb Cr.
fn check_layout(jpeg: &Jpeg) -> Result<()> {
    let sampling_ok = jpeg
        .components
        .iter()
        .zip(SAMPLING_420.iter())
        .all(|(c, &(h, v))| c.h == h && c.v == v);
    let order_ok = jpeg.component_index.len() % MCU_LAYOUT_420.len() == 0
        && jpeg
            .component_index
            .chunks_exact(MCU_LAYOUT_420.len())
            .all(|mcu| mcu == MCU_LAYOUT_420);

    if !sampling_ok || !order_ok {
        return Err(JpegError::unsupported(
            "only 4:2:0 images with Y, Cb, Cr scan order can be encoded",
        ));
    }
    Ok(())
}

/// Entropy-code all blocks. Each component keeps its own DC predictor.
fn encode_scan(jpeg: &Jpeg) -> Result<Vec<u8>> {
    let encoders = fixed_encoders();
    let mut writer = BitWriter::with_capacity(jpeg.blocks.len() * 16);
    let mut dc_predictors = [0i32; 3];

    for (block, &component) in jpeg.blocks.iter().zip(&jpeg.component_index) {
        let (dc, ac) = if component == 0 {
            (HuffmanIndex::LuminanceDc, HuffmanIndex::LuminanceAc)
        } else {
            (HuffmanIndex::ChrominanceDc, HuffmanIndex::ChrominanceAc)
        };
        encode_block(
            &mut writer,
            block,
            &encoders[dc as usize],
            &encoders[ac as usize],
            &mut dc_predictors[component as usize],
        )?;
    }

    Ok(writer.into_bytes())
}

fn write_marker(output: &mut Vec<u8>, marker: Marker) {
    output.push(0xFF);
    output.push(marker.to_u8());
}

/// Write a marker followed by its length field (which counts itself).
fn write_segment_header(output: &mut Vec<u8>, marker: Marker, body_len: usize) {
    write_marker(output, marker);
    output.extend_from_slice(&((body_len + 2) as u16).to_be_bytes());
}

/// One 8-bit table at destination 0 with every entry 1.
fn write_dqt(output: &mut Vec<u8>) {
    write_segment_header(output, Marker::DQT, 1 + BLOCK_SIZE);
    output.push(0x00);
    output.extend_from_slice(&[1u8; BLOCK_SIZE]);
}

fn write_sof0(output: &mut Vec<u8>, width: u16, height: u16) {
    write_segment_header(output, Marker::SOF(0), 6 + 3 * 3);
    output.push(8);
    output.extend_from_slice(&height.to_be_bytes());
    output.extend_from_slice(&width.to_be_bytes());
    output.push(3);
    for (i, &(h, v)) in SAMPLING_420.iter().enumerate() {
        output.extend_from_slice(&[i as u8 + 1, h << 4 | v, 0]);
    }
}

fn write_dht(output: &mut Vec<u8>) {
    let body_len: usize = FIXED_HUFFMAN_SPECS
        .iter()
        .map(|spec| 1 + spec.counts.len() + spec.values.len())
        .sum();
    write_segment_header(output, Marker::DHT, body_len);
    for index in DHT_TABLES {
        let spec = &FIXED_HUFFMAN_SPECS[index as usize];
        output.push(index.class_and_destination());
        output.extend_from_slice(&spec.counts);
        output.extend_from_slice(spec.values);
    }
}
