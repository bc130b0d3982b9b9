//! JPEG marker definitions (ITU T.81 Table B.1).

/// A marker byte following `0xFF`, reduced to the kinds this codec reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Marker {
    /// Start of Frame. The parameter is the SOF type (0 = baseline).
    SOF(u8),
    /// Define Huffman Table.
    DHT,
    /// Restart marker (0-7).
    RST(u8),
    /// Start of Image.
    SOI,
    /// End of Image.
    EOI,
    /// Start of Scan.
    SOS,
    /// Define Quantization Table.
    DQT,
    /// Define Restart Interval.
    DRI,
    /// Application segment (0-15).
    APP(u8),
    /// Comment.
    COM,
    /// Anything else: reserved, arithmetic-coding or hierarchical markers.
    Other(u8),
}

impl Marker {
    /// Convert a byte to a Marker.
    ///
    /// Returns None for 0x00 (stuffed byte) and 0xFF (fill byte).
    pub fn from_u8(n: u8) -> Option<Marker> {
        use Marker::*;
        match n {
            0x00 | 0xFF => None,
            0xC4 => Some(DHT),
            0xC8 | 0xCC => Some(Other(n)),
            0xC0..=0xCF => Some(SOF(n - 0xC0)),
            0xD0..=0xD7 => Some(RST(n - 0xD0)),
            0xD8 => Some(SOI),
            0xD9 => Some(EOI),
            0xDA => Some(SOS),
            0xDB => Some(DQT),
            0xDD => Some(DRI),
            0xE0..=0xEF => Some(APP(n - 0xE0)),
            0xFE => Some(COM),
            _ => Some(Other(n)),
        }
    }

    /// Convert the marker back to its byte representation.
    pub fn to_u8(self) -> u8 {
        use Marker::*;
        match self {
            SOF(n) => 0xC0 + n,
            DHT => 0xC4,
            RST(n) => 0xD0 + n,
            SOI => 0xD8,
            EOI => 0xD9,
            SOS => 0xDA,
            DQT => 0xDB,
            DRI => 0xDD,
            APP(n) => 0xE0 + n,
            COM => 0xFE,
            Other(n) => n,
        }
    }
}
