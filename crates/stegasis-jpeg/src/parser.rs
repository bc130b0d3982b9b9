//! Marker segment parsing for baseline JPEG.
//!
//! The parser is a single pass over the stream: SOI, then a loop over marker
//! segments until EOI. Table segments update the decoder state, SOS runs the
//! entropy decoder in [`crate::scan`] right away and APPn/COM are skipped.
//! An image may carry several sequential scans, for example one per
//! component; their blocks are appended in scan order.

use std::io::{self, Read};

use crate::error::{JpegError, Result};
use crate::huffman::{HuffmanTable, MAX_CODE_LENGTH};
use crate::image::{Component, Jpeg, QuantizationTable};
use crate::marker::Marker;
use crate::scan::{self, DecodedScan, ScanComponent};
use crate::tables::BLOCK_SIZE;

/// Huffman table class: 0 = DC, 1 = AC.
const DC_TABLE: usize = 0;
const AC_TABLE: usize = 1;

/// Highest Huffman table destination (ITU T.81 B.2.4.2).
const MAX_TH: u8 = 3;
/// Highest quantization table destination.
const MAX_TQ: u8 = 3;

/// Frame parameters from SOF0.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub width: u16,
    pub height: u16,
    pub components: [Component; 3],
}

/// Decode a complete image from `reader`. Nothing after EOI is consumed.
pub(crate) fn decode<R: Read>(reader: &mut R) -> Result<Jpeg> {
    Decoder::new(reader).decode()
}

/// Read exactly `buf.len()` bytes; a short read means the file is truncated.
fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => JpegError::format("unexpected end of file"),
        _ => JpegError::Io(e),
    })
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_exact(reader, &mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    read_exact(reader, &mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

struct Decoder<'r, R> {
    reader: &'r mut R,
    frame: Option<FrameHeader>,
    /// Indexed by class, then destination.
    huffman: [[Option<HuffmanTable>; 4]; 2],
    quant: [Option<QuantizationTable>; 4],
    restart_interval: u16,
    scans: usize,
    decoded: DecodedScan,
}

impl<'r, R: Read> Decoder<'r, R> {
    fn new(reader: &'r mut R) -> Self {
        Decoder {
            reader,
            frame: None,
            huffman: Default::default(),
            quant: Default::default(),
            restart_interval: 0,
            scans: 0,
            decoded: DecodedScan::default(),
        }
    }

    fn decode(mut self) -> Result<Jpeg> {
        let mut soi = [0u8; 2];
        read_exact(self.reader, &mut soi)?;
        if soi != [0xFF, Marker::SOI.to_u8()] {
            return Err(JpegError::format("missing SOI marker at start of file"));
        }

        loop {
            let marker = self.next_marker()?;
            if marker == Marker::EOI {
                break;
            }
            self.process_segment(marker)?;
        }

        self.finish()
    }

    /// Read up to the next marker byte.
    ///
    /// Every marker starts with `0xFF`. Fill bytes (`0xFF`) before the marker
    /// byte are skipped and `0xFF00` between segments is ignored.
    fn next_marker(&mut self) -> Result<Marker> {
        loop {
            let mut tag = [0u8; 2];
            read_exact(self.reader, &mut tag)?;
            if tag[0] != 0xFF {
                return Err(JpegError::format(format!(
                    "expected 0xFF before marker, found 0x{:02X}",
                    tag[0]
                )));
            }

            let mut byte = tag[1];
            if byte == 0x00 {
                continue;
            }
            while byte == 0xFF {
                byte = read_u8(self.reader)?;
            }
            if let Some(marker) = Marker::from_u8(byte) {
                return Ok(marker);
            }
        }
    }

    fn process_segment(&mut self, marker: Marker) -> Result<()> {
        let byte = marker.to_u8();
        match marker {
            Marker::SOF(0) | Marker::DHT | Marker::DQT | Marker::DRI | Marker::SOS => {}
            Marker::SOF(1) | Marker::SOF(2) => {
                return Err(JpegError::unsupported("SOF1 and SOF2 frames"));
            }
            Marker::SOF(n) => {
                return Err(JpegError::unsupported(format!("SOF{} frames", n)));
            }
            Marker::APP(_) | Marker::COM => {}
            _ if byte < 0xC0 => {
                return Err(JpegError::format(format!("unknown marker: {:02x}", byte)));
            }
            _ => return Err(JpegError::format(format!("bad marker: {:02x}", byte))),
        }

        let length = read_u16(self.reader)? as usize;
        if length < 2 {
            return Err(JpegError::format("short segment length"));
        }
        let n = length - 2;
        log::trace!("marker {:?}: {} bytes", marker, n);

        match marker {
            Marker::SOF(_) => self.process_sof(n),
            Marker::DHT => self.process_dht(n),
            Marker::DQT => self.process_dqt(n),
            Marker::DRI => self.process_dri(n),
            Marker::SOS => self.process_sos(n),
            _ => self.skip(n),
        }
    }

    fn read_segment(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut data = vec![0u8; n];
        read_exact(self.reader, &mut data)?;
        Ok(data)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        let skipped = io::copy(&mut (&mut *self.reader).take(n as u64), &mut io::sink())?;
        if skipped != n as u64 {
            return Err(JpegError::format("unexpected end of file"));
        }
        Ok(())
    }

    fn process_sof(&mut self, n: usize) -> Result<()> {
        if self.frame.is_some() {
            return Err(JpegError::format("multiple SOF markers"));
        }
        if n < 6 {
            return Err(JpegError::format("SOF has wrong length"));
        }
        let data = self.read_segment(n)?;

        if data[0] != 8 {
            return Err(JpegError::unsupported(format!(
                "{}-bit precision, only 8-bit is supported",
                data[0]
            )));
        }
        let height = u16::from_be_bytes([data[1], data[2]]);
        let width = u16::from_be_bytes([data[3], data[4]]);
        let ncomp = data[5] as usize;
        if ncomp != 3 {
            return Err(JpegError::unsupported(format!(
                "{} components, only YCbCr / RGB images are supported",
                ncomp
            )));
        }
        if n != 6 + 3 * ncomp {
            return Err(JpegError::format("SOF has wrong length"));
        }
        if width == 0 || height == 0 {
            return Err(JpegError::unsupported("zero image dimension (DNL marker)"));
        }

        let mut components = [Component {
            id: 0,
            h: 0,
            v: 0,
            tq: 0,
        }; 3];
        for (component, spec) in components.iter_mut().zip(data[6..].chunks_exact(3)) {
            let (h, v) = (spec[1] >> 4, spec[1] & 0x0f);
            if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
                return Err(JpegError::format("bad sampling factor"));
            }
            if spec[2] > MAX_TQ {
                return Err(JpegError::format("bad Tq value"));
            }
            *component = Component {
                id: spec[0],
                h,
                v,
                tq: spec[2],
            };
        }

        self.frame = Some(FrameHeader {
            width,
            height,
            components,
        });
        Ok(())
    }

    fn process_dht(&mut self, n: usize) -> Result<()> {
        let data = self.read_segment(n)?;
        let mut rest = data.as_slice();

        while !rest.is_empty() {
            if rest.len() < 1 + MAX_CODE_LENGTH {
                return Err(JpegError::format("DHT has wrong length"));
            }
            let tc = rest[0] >> 4;
            let th = rest[0] & 0x0f;
            if tc > 1 {
                return Err(JpegError::format("bad Tc value"));
            }
            if th > MAX_TH {
                return Err(JpegError::format("bad Th value"));
            }

            let mut counts = [0u8; MAX_CODE_LENGTH];
            counts.copy_from_slice(&rest[1..1 + MAX_CODE_LENGTH]);
            let n_codes: usize = counts.iter().map(|&c| c as usize).sum();
            let end = 1 + MAX_CODE_LENGTH + n_codes;
            if n_codes > 0 && end > rest.len() {
                return Err(JpegError::format("DHT has wrong length"));
            }

            let table = HuffmanTable::new(&counts, &rest[1 + MAX_CODE_LENGTH..end])?;
            log::trace!(
                "DHT class {} destination {}: {} codes",
                tc,
                th,
                table.n_codes()
            );
            self.huffman[tc as usize][th as usize] = Some(table);
            rest = &rest[end..];
        }
        Ok(())
    }

    fn process_dqt(&mut self, n: usize) -> Result<()> {
        let data = self.read_segment(n)?;
        let mut rest = data.as_slice();

        while let Some((&pq_tq, tail)) = rest.split_first() {
            let tq = pq_tq & 0x0f;
            if tq > MAX_TQ {
                return Err(JpegError::format("bad Tq value"));
            }
            let precision = pq_tq >> 4;
            let width = match precision {
                0 => 1,
                1 => 2,
                _ => return Err(JpegError::format("bad Pq value")),
            };
            let table_len = width * BLOCK_SIZE;
            if tail.len() < table_len {
                return Err(JpegError::format("DQT has wrong length"));
            }

            // 16-bit entries keep their high byte.
            let mut values = [0u8; BLOCK_SIZE];
            for (value, entry) in values.iter_mut().zip(tail[..table_len].chunks_exact(width)) {
                *value = entry[0];
            }
            self.quant[tq as usize] = Some(QuantizationTable { precision, values });
            rest = &tail[table_len..];
        }
        Ok(())
    }

    fn process_dri(&mut self, n: usize) -> Result<()> {
        if n != 2 {
            return Err(JpegError::format("DRI has wrong length"));
        }
        self.restart_interval = read_u16(self.reader)?;
        Ok(())
    }

    fn process_sos(&mut self, n: usize) -> Result<()> {
        let frame = self
            .frame
            .ok_or_else(|| JpegError::format("SOS marker before SOF"))?;
        if n == 0 {
            return Err(JpegError::format("SOS has wrong length"));
        }
        let data = self.read_segment(n)?;

        let ncomp = data[0] as usize;
        if n != 4 + 2 * ncomp {
            return Err(JpegError::format(
                "SOS length inconsistent with number of components",
            ));
        }
        if !(1..=3).contains(&ncomp) {
            return Err(JpegError::format(format!(
                "bad number of scan components: {}",
                ncomp
            )));
        }

        let mut components = Vec::with_capacity(ncomp);
        for spec in data[1..1 + 2 * ncomp].chunks_exact(2) {
            let index = frame
                .components
                .iter()
                .position(|c| c.id == spec[0])
                .ok_or_else(|| JpegError::format("unknown component selector"))?;

            // Baseline allows table selectors 0 and 1 only (Table B.3).
            let td = spec[1] >> 4;
            if td > 1 {
                return Err(JpegError::format("bad Td value"));
            }
            let ta = spec[1] & 0x0f;
            if ta > 1 {
                return Err(JpegError::format("bad Ta value"));
            }

            let dc = self.huffman[DC_TABLE][td as usize]
                .as_ref()
                .ok_or_else(|| JpegError::format(format!("missing DC Huffman table {}", td)))?;
            let ac = self.huffman[AC_TABLE][ta as usize]
                .as_ref()
                .ok_or_else(|| JpegError::format(format!("missing AC Huffman table {}", ta)))?;
            components.push(ScanComponent { index, dc, ac });
        }

        scan::decode_scan(
            self.reader,
            &frame,
            self.restart_interval,
            &components,
            &mut self.decoded,
        )?;
        self.scans += 1;
        Ok(())
    }

    fn finish(self) -> Result<Jpeg> {
        let frame = self
            .frame
            .ok_or_else(|| JpegError::format("missing SOF marker"))?;
        if self.scans == 0 {
            return Err(JpegError::format("missing SOS marker"));
        }
        let scan = self.decoded;

        log::debug!(
            "decoded {}x{} image: {} blocks in {} scans, restart interval {}",
            frame.width,
            frame.height,
            scan.blocks.len(),
            self.scans,
            self.restart_interval
        );

        Ok(Jpeg {
            path: None,
            width: frame.width,
            height: frame.height,
            restart_interval: self.restart_interval,
            components: frame.components,
            quant: self.quant,
            blocks: scan.blocks,
            component_index: scan.component_index,
            dirty: false,
        })
    }
}
