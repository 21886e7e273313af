//! Common test utilities for gini-parser tests
//!
//! Synthesizes GINI products in memory:
//! - WMO heading plus product description block, optionally zlib-wrapped
//! - Lambert, Mercator or unknown projection fields
//! - Optional calibration block
//! - Pixel payload stored verbatim, as PNG, or as one or more zlib streams

#![allow(dead_code)]

use std::io::{Cursor, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{GrayImage, ImageFormat};

pub const HEADING: &[u8; 21] = b"TIGE01 KNES 141815\r\r\n";
pub const PDB_LEN: usize = 512;

/// Deterministic pseudo-random bytes.
///
/// Noise barely compresses, which keeps compressed products above the
/// minimum header window. The first byte is zero so a verbatim payload is
/// never mistaken for a zlib stream.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    let mut out: Vec<u8> = (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect();
    if let Some(first) = out.first_mut() {
        *first = 0;
    }
    out
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn png(nx: u32, ny: u32, samples: &[u8]) -> Vec<u8> {
    let img = GrayImage::from_raw(nx, ny, samples.to_vec()).unwrap();
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Write a 3-byte sign-magnitude value scaled by 10000.
pub fn put_scaled(pdb: &mut [u8; PDB_LEN], offset: usize, value: f64) {
    let magnitude = (value.abs() * 10000.0).round() as u32;
    let mut bytes = [
        ((magnitude >> 16) & 0x7F) as u8,
        (magnitude >> 8) as u8,
        magnitude as u8,
    ];
    if value < 0.0 {
        bytes[0] |= 0x80;
    }
    pdb[offset..offset + 3].copy_from_slice(&bytes);
}

/// How the pixel payload is stored.
#[derive(Debug, Clone)]
pub enum PayloadEncoding {
    Raw,
    Png,
    /// One zlib stream per segment, split at the given payload offsets.
    Deflate(Vec<usize>),
    /// Deflate up to the offset, then the rest verbatim.
    DeflateWithTrailer(usize),
}

/// Builder for synthetic GINI products.
#[derive(Debug, Clone)]
pub struct GiniFile {
    pub heading: Vec<u8>,
    pub prefix: Vec<u8>,
    pub pdb: [u8; PDB_LEN],
    pub nx: u16,
    pub ny: u16,
    pub payload: Vec<u8>,
    pub encoding: PayloadEncoding,
    pub compressed_header: bool,
    /// Omit the outer WMO heading; the product starts with the zlib stream
    pub self_describing: bool,
}

impl GiniFile {
    /// GOES-12 East CONUS IR on a Lambert grid.
    pub fn lambert(nx: u16, ny: u16) -> Self {
        let mut pdb = [0u8; PDB_LEN];
        pdb[..4].copy_from_slice(&[8, 15, 1, 4]);
        pdb[8..14].copy_from_slice(&[9, 7, 14, 18, 15, 0]);
        pdb[15] = 3;
        pdb[16..18].copy_from_slice(&nx.to_be_bytes());
        pdb[18..20].copy_from_slice(&ny.to_be_bytes());
        put_scaled(&mut pdb, 20, 16.3691);
        put_scaled(&mut pdb, 23, -125.0);
        put_scaled(&mut pdb, 27, -95.0);
        put_scaled(&mut pdb, 30, 4.0635);
        put_scaled(&mut pdb, 33, 4.0635);
        put_scaled(&mut pdb, 38, 25.0);
        pdb[41] = 4;

        Self {
            heading: HEADING.to_vec(),
            prefix: Vec::new(),
            pdb,
            nx,
            ny,
            payload: noise(nx as usize * ny as usize, 7),
            encoding: PayloadEncoding::Raw,
            compressed_header: false,
            self_describing: false,
        }
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn encoding(mut self, encoding: PayloadEncoding) -> Self {
        if matches!(encoding, PayloadEncoding::Png) {
            self.pdb[42] = 128;
        }
        self.encoding = encoding;
        self
    }

    pub fn compressed_header(mut self) -> Self {
        self.compressed_header = true;
        self
    }

    /// Zlib-wrapped header with no outer heading. The WMO marker is only
    /// found once the header is inflated.
    pub fn self_describing(mut self) -> Self {
        self.compressed_header = true;
        self.self_describing = true;
        self
    }

    pub fn marker(mut self, marker: &[u8; 4]) -> Self {
        self.heading[7..11].copy_from_slice(marker);
        self
    }

    /// Bytes placed before the WMO heading (e.g. an SBN frame).
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    pub fn entity(mut self, entity: u8, element: u8) -> Self {
        self.pdb[1] = entity;
        self.pdb[3] = element;
        self
    }

    pub fn projection_code(mut self, code: u8) -> Self {
        self.pdb[15] = code;
        self
    }

    /// Calibration block from `(min_raw, max_raw, min_data, max_data)`
    /// records; raw counts are stored scaled by 10000.
    pub fn calibration(mut self, label: &str, records: &[(i32, i32, i32, i32)]) -> Self {
        self.pdb[46] = 128;
        let mut padded = [b' '; 8];
        padded[..label.len()].copy_from_slice(label.as_bytes());
        self.pdb[47..55].copy_from_slice(&padded);
        self.pdb[55] = records.len() as u8;
        for (i, &(min_raw, max_raw, min_data, max_data)) in records.iter().enumerate() {
            let start = 56 + 16 * i;
            let fields = [min_raw * 10000, max_raw * 10000, min_data, max_data];
            for (j, value) in fields.iter().enumerate() {
                self.pdb[start + 4 * j..start + 4 * j + 4].copy_from_slice(&value.to_be_bytes());
            }
        }
        self
    }

    /// Offset of the first byte after the heading.
    pub fn header_start(&self) -> usize {
        if self.self_describing {
            self.prefix.len()
        } else {
            self.prefix.len() + self.heading.len()
        }
    }

    pub fn header_block(&self) -> Vec<u8> {
        if self.compressed_header {
            let mut inner = self.heading.clone();
            inner.extend_from_slice(&self.pdb);
            zlib(&inner)
        } else {
            self.pdb.to_vec()
        }
    }

    pub fn encoded_payload(&self) -> Vec<u8> {
        match &self.encoding {
            PayloadEncoding::Raw => self.payload.clone(),
            PayloadEncoding::Png => png(self.nx as u32, self.ny as u32, &self.payload),
            PayloadEncoding::Deflate(splits) => {
                let mut bounds = vec![0];
                bounds.extend(splits.iter().copied());
                bounds.push(self.payload.len());
                bounds
                    .windows(2)
                    .flat_map(|w| zlib(&self.payload[w[0]..w[1]]))
                    .collect()
            }
            PayloadEncoding::DeflateWithTrailer(split) => {
                let mut out = zlib(&self.payload[..*split]);
                out.extend_from_slice(&self.payload[*split..]);
                out
            }
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.prefix.clone();
        if !self.self_describing {
            out.extend_from_slice(&self.heading);
        }
        out.extend(self.header_block());
        out.extend(self.encoded_payload());
        out
    }

    pub fn cursor(&self) -> Cursor<Vec<u8>> {
        Cursor::new(self.build())
    }
}
