use std::fs::{self, File};
use std::io::BufReader;

use tempfile::TempDir;

use stegasis_jpeg::*;

fn segment(marker: Marker, body: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker.to_u8()];
    out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// A complete baseline image with the given frame parameters and entropy data.
fn image_bytes(
    width: u16,
    height: u16,
    sampling: [u8; 3],
    restart_interval: u16,
    scan: &[u8],
) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend(segment(Marker::APP(0), b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0"));

    let mut dqt = vec![0x00];
    dqt.extend((0..64).map(|i| 2 + i as u8));
    data.extend(segment(Marker::DQT, &dqt));

    let mut sof = vec![8];
    sof.extend_from_slice(&height.to_be_bytes());
    sof.extend_from_slice(&width.to_be_bytes());
    sof.push(3);
    for (i, hv) in sampling.iter().enumerate() {
        sof.extend_from_slice(&[i as u8 + 1, *hv, 0]);
    }
    data.extend(segment(Marker::SOF(0), &sof));

    let mut dht = Vec::new();
    for index in [
        HuffmanIndex::LuminanceDc,
        HuffmanIndex::ChrominanceDc,
        HuffmanIndex::LuminanceAc,
        HuffmanIndex::ChrominanceAc,
    ] {
        let spec = &FIXED_HUFFMAN_SPECS[index as usize];
        dht.push(index.class_and_destination());
        dht.extend_from_slice(&spec.counts);
        dht.extend_from_slice(spec.values);
    }
    data.extend(segment(Marker::DHT, &dht));

    if restart_interval > 0 {
        data.extend(segment(Marker::DRI, &restart_interval.to_be_bytes()));
    }

    data.extend_from_slice(&SOS_HEADER_YCBCR);
    data.extend_from_slice(scan);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

/// Emit a block with the given DC delta and no AC data.
fn emit_dc_only(writer: &mut BitWriter, component: u8, delta: i32) {
    let (dc, ac) = if component == 0 {
        (HuffmanIndex::LuminanceDc, HuffmanIndex::LuminanceAc)
    } else {
        (HuffmanIndex::ChrominanceDc, HuffmanIndex::ChrominanceAc)
    };
    let (size, bits) = encode_coefficient(delta);
    writer.emit_huffman(size, fixed_encoder(dc)).unwrap();
    writer.emit(bits, size as u32);
    writer.emit_huffman(0x00, fixed_encoder(ac)).unwrap();
}

/// A 32x32 4:2:0 image (2x2 MCUs) with restart interval 2. `rst` is the
/// marker written between the second and third MCU.
///
/// Returns the bytes and the absolute DC values the decoder must produce.
fn restart_image(rst: u8) -> (Vec<u8>, Vec<i32>) {
    const LAYOUT: [u8; 6] = [0, 0, 0, 0, 1, 2];
    let deltas = [
        [5, -3, 2, 7, -4, 9],
        [1, 1, -2, 3, 6, -1],
        [-8, 4, 4, -1, 2, 3],
        [2, -2, 10, 1, -5, 7],
    ];

    let mut writer = BitWriter::new();
    let mut expected = Vec::new();
    let mut predictors = [0i32; 3];
    for (mcu, mcu_deltas) in deltas.iter().enumerate() {
        if mcu == 2 {
            writer.write_raw(&[0xFF, rst]);
            predictors = [0; 3];
        }
        for (&component, &delta) in LAYOUT.iter().zip(mcu_deltas) {
            emit_dc_only(&mut writer, component, delta);
            predictors[component as usize] += delta;
            expected.push(predictors[component as usize]);
        }
    }

    let data = image_bytes(32, 32, [0x22, 0x11, 0x11], 2, &writer.into_bytes());
    (data, expected)
}

/// An 80x8 4:4:4 image of ten MCUs with restart interval 1. The marker after
/// MCU `m` (counting from 1) is `RST((m - 1) % 8)`, except that `wrap` is
/// written after MCU 9 where the sequence wraps back to RST0.
fn restart_every_mcu(wrap: u8) -> Vec<u8> {
    let mut writer = BitWriter::new();
    for mcu in 0..10 {
        if mcu > 0 {
            let marker = if mcu == 9 { wrap } else { 0xD0 + (mcu as u8 - 1) % 8 };
            writer.write_raw(&[0xFF, marker]);
        }
        emit_dc_only(&mut writer, 0, mcu + 1);
        emit_dc_only(&mut writer, 1, -mcu);
        emit_dc_only(&mut writer, 2, 3 - mcu);
    }
    image_bytes(80, 8, [0x11, 0x11, 0x11], 1, &writer.into_bytes())
}

fn random_image(seed: u64, width: u16, height: u16) -> Jpeg {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut jpeg = Jpeg::blank(width, height).unwrap();
    for i in 0..jpeg.size() {
        let value = match i % 64 {
            0 => rng.i32(-600..=600),
            k if k < 16 => rng.i32(-40..=40),
            _ if i % 7 == 0 => rng.i32(-3..=3),
            _ => 0,
        };
        jpeg.set(i, value).unwrap();
    }
    jpeg
}

/// Entropy-coded bytes of a file written by this crate.
fn entropy_segment(data: &[u8]) -> &[u8] {
    let start = data
        .windows(SOS_HEADER_YCBCR.len())
        .position(|w| w == SOS_HEADER_YCBCR)
        .unwrap()
        + SOS_HEADER_YCBCR.len();
    &data[start..data.len() - 2]
}

#[test]
fn unmodified_coefficients_survive_reencoding() {
    let source = random_image(1, 64, 48).to_bytes().unwrap();

    let first = Jpeg::decode(&source).unwrap();
    let reencoded = first.to_bytes().unwrap();
    let second = Jpeg::decode(&reencoded).unwrap();

    assert_eq!(first.size(), second.size());
    assert_eq!(first.blocks(), second.blocks());
    for block in 0..first.blocks().len() {
        assert_eq!(first.block_component(block), second.block_component(block));
    }
}

#[test]
fn foreign_tables_and_restarts_survive_reencoding() {
    let (source, _) = restart_image(0xD0);
    let first = Jpeg::decode(&source).unwrap();
    assert_eq!(first.restart_interval(), 2);
    assert_eq!(first.quantization_table(0).unwrap().values[0], 2);

    let reencoded = first.to_bytes().unwrap();
    assert_ne!(source, reencoded);
    let second = Jpeg::decode(&reencoded).unwrap();
    assert_eq!(second.restart_interval(), 0);
    assert_eq!(first.blocks(), second.blocks());
}

#[test]
fn modified_coefficients_are_written() {
    let mut jpeg = random_image(2, 32, 32);
    let size = jpeg.size();
    let mut rng = fastrand::Rng::with_seed(3);
    let changes: Vec<(usize, i32)> = (0..200)
        .map(|_| (rng.usize(..size), rng.i32(-100..=100)))
        .collect();
    for &(i, value) in &changes {
        jpeg.set(i, value).unwrap();
    }

    let decoded = Jpeg::decode(&jpeg.to_bytes().unwrap()).unwrap();
    for i in 0..size {
        assert_eq!(decoded.get(i).unwrap(), jpeg.get(i).unwrap(), "coefficient {i}");
    }
}

#[test]
fn dirty_tracking_and_file_encode() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("image-0.jpeg");
    fs::write(&path, random_image(4, 32, 16).to_bytes().unwrap()).unwrap();

    let mut jpeg = Jpeg::open(&path).unwrap();
    assert!(!jpeg.is_dirty());
    assert_eq!(jpeg.path(), Some(path.as_path()));

    // A clean image leaves its file alone.
    fs::write(&path, b"sentinel").unwrap();
    jpeg.encode().unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"sentinel");

    jpeg.set(65, 42).unwrap();
    assert!(jpeg.is_dirty());
    jpeg.encode().unwrap();
    assert!(!jpeg.is_dirty());

    let reopened = Jpeg::open(&path).unwrap();
    assert_eq!(reopened.get(65).unwrap(), 42);
    assert_eq!(reopened.blocks(), jpeg.blocks());
}

#[test]
fn decode_from_buffered_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("image-0.jpeg");
    let bytes = random_image(8, 48, 32).to_bytes().unwrap();
    fs::write(&path, &bytes).unwrap();

    let mut reader = BufReader::new(File::open(&path).unwrap());
    let jpeg = Jpeg::decode_reader(&mut reader).unwrap();
    assert_eq!(jpeg.blocks(), Jpeg::decode(&bytes).unwrap().blocks());
    assert_eq!(jpeg.path(), None);
}

#[test]
fn encode_to_writer() {
    let jpeg = random_image(5, 16, 16);
    let mut out = Vec::new();
    jpeg.encode_to(&mut out).unwrap();
    assert_eq!(out, jpeg.to_bytes().unwrap());
}

#[test]
fn bounds_are_enforced() {
    let mut jpeg = random_image(6, 16, 16);
    let size = jpeg.size();
    assert_eq!(size, 6 * 64);

    assert!(jpeg.get(size - 1).is_ok());
    for i in [size, size + 1, usize::MAX] {
        assert!(matches!(jpeg.get(i), Err(JpegError::OutOfBounds { .. })));
        assert!(matches!(jpeg.set(i, 0), Err(JpegError::OutOfBounds { .. })));
    }
}

#[test]
fn entropy_data_is_byte_stuffed() {
    let data = random_image(7, 128, 64).to_bytes().unwrap();
    let scan = entropy_segment(&data);
    assert!(scan.contains(&0xFF), "test image should produce 0xFF bytes");
    for (i, pair) in scan.windows(2).enumerate() {
        if pair[0] == 0xFF {
            assert_eq!(pair[1], 0x00, "unstuffed 0xFF at offset {i}");
        }
    }
    assert_ne!(scan.last(), Some(&0xFF));
}

#[test]
fn unstuffed_ff_is_rejected() {
    let data = image_bytes(16, 16, [0x22, 0x11, 0x11], 0, &[0xFF, 0x12, 0x00]);
    let err = Jpeg::decode(&data).unwrap_err();
    assert!(matches!(err, JpegError::Format { .. }), "{err}");
    assert!(err.to_string().contains("missing 0xFF00 sequence"), "{err}");
}

#[test]
fn restart_markers_reset_dc_prediction() {
    let (data, expected) = restart_image(0xD0);
    let jpeg = Jpeg::decode(&data).unwrap();

    assert_eq!(jpeg.blocks().len(), 24);
    let dcs: Vec<i32> = jpeg.blocks().iter().map(|b| b[0]).collect();
    assert_eq!(dcs, expected);
    // After RST0 the first luma block starts from 0 again.
    assert_eq!(dcs[12], -8);
}

#[test]
fn out_of_sequence_restart_marker_is_rejected() {
    let (data, _) = restart_image(0xD1);
    let err = Jpeg::decode(&data).unwrap_err();
    assert!(err.to_string().contains("bad RST marker"), "{err}");
}

#[test]
fn restart_markers_wrap_after_rst7() {
    let jpeg = Jpeg::decode(&restart_every_mcu(0xD0)).unwrap();
    assert_eq!(jpeg.restart_interval(), 1);
    assert_eq!(jpeg.blocks().len(), 30);

    // Every MCU starts from zero predictors, so each DC is its own delta.
    for mcu in 0..10 {
        let dc = |block: usize| jpeg.blocks()[3 * mcu + block][0];
        let mcu = mcu as i32;
        assert_eq!(dc(0), mcu + 1, "Y in MCU {mcu}");
        assert_eq!(dc(1), -mcu, "Cb in MCU {mcu}");
        assert_eq!(dc(2), 3 - mcu, "Cr in MCU {mcu}");
    }
}

#[test]
fn restart_marker_past_rst7_is_rejected() {
    for wrap in [0xD8, 0xD7, 0xD1] {
        let err = Jpeg::decode(&restart_every_mcu(wrap)).unwrap_err();
        assert!(err.to_string().contains("bad RST marker"), "{wrap:02X}: {err}");
    }
}

#[test]
fn non_420_images_decode_but_do_not_encode() {
    // 32x8 at 4:4:4: four MCUs of three blocks each.
    let mut writer = BitWriter::new();
    for _ in 0..4 {
        emit_dc_only(&mut writer, 0, 1);
        emit_dc_only(&mut writer, 1, -1);
        emit_dc_only(&mut writer, 2, 0);
    }
    let data = image_bytes(32, 8, [0x11, 0x11, 0x11], 0, &writer.into_bytes());

    let jpeg = Jpeg::decode(&data).unwrap();
    assert_eq!(jpeg.blocks().len(), 12);
    assert_eq!(jpeg.blocks()[9][0], 4);
    assert_eq!(jpeg.blocks()[10][0], -4);
    assert!(matches!(jpeg.to_bytes(), Err(JpegError::Unsupported { .. })));
}
