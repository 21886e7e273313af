//! Pixel payload decoding.
//!
//! The payload follows the header at `data_start` and is stored under one
//! of three schemes: verbatim, a lossless image codec (PNG), or a sequence
//! of zlib streams that may end in an uncompressed trailer.

pub mod image_codec;
pub mod inflate;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::header::{CompressionScheme, RasterProductHeader};
use crate::source::{read_exact_at, read_to_end_from, ByteSource};
use crate::{DecodeError, Result};

pub use image_codec::{ImageCodec, ImageCrateCodec};
pub use inflate::inflate_with_resync;

/// Bytes per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SampleWidth {
    #[default]
    One,
    Two,
    Four,
}

impl SampleWidth {
    pub fn bytes(&self) -> usize {
        match self {
            SampleWidth::One => 1,
            SampleWidth::Two => 2,
            SampleWidth::Four => 4,
        }
    }

    pub fn from_bytes(n: usize) -> Option<Self> {
        match n {
            1 => Some(SampleWidth::One),
            2 => Some(SampleWidth::Two),
            4 => Some(SampleWidth::Four),
            _ => None,
        }
    }
}

/// Row-major raw samples, big-endian when wider than one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    nx: usize,
    ny: usize,
    width: SampleWidth,
    bytes: Vec<u8>,
}

impl SampleBuffer {
    pub fn new(nx: usize, ny: usize, width: SampleWidth, bytes: Vec<u8>) -> Result<Self> {
        let expected = nx * ny * width.bytes();
        if bytes.len() != expected {
            return Err(DecodeError::Decompression(format!(
                "sample buffer for {}x{} needs {} bytes, got {}",
                nx,
                ny,
                expected,
                bytes.len()
            )));
        }
        Ok(Self {
            nx,
            ny,
            width,
            bytes,
        })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn width(&self) -> SampleWidth {
        self.width
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Sample at flat index `i`.
    pub fn sample(&self, i: usize) -> Option<u32> {
        let w = self.width.bytes();
        self.bytes.get(i * w..(i + 1) * w).map(be_sample)
    }

    /// Sample at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.nx || y >= self.ny {
            return None;
        }
        self.sample(y * self.nx + x)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes.chunks_exact(self.width.bytes()).map(be_sample)
    }
}

fn be_sample(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

/// Decodes the pixel payload described by a header.
pub struct PixelPayloadDecoder {
    codec: Box<dyn ImageCodec>,
}

impl Default for PixelPayloadDecoder {
    fn default() -> Self {
        Self::with_codec(ImageCrateCodec)
    }
}

impl PixelPayloadDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codec(codec: impl ImageCodec + 'static) -> Self {
        Self {
            codec: Box::new(codec),
        }
    }

    /// Produce exactly `nx * ny` samples.
    ///
    /// The token is polled while inflating; a cancelled decode returns
    /// `Cancelled` and no partial buffer.
    pub fn decode<R: ByteSource + ?Sized>(
        &self,
        reader: &mut R,
        header: &RasterProductHeader,
        cancel: &CancellationToken,
    ) -> Result<SampleBuffer> {
        if cancel.is_cancelled() {
            return Err(DecodeError::Cancelled);
        }

        let nx = header.nx() as usize;
        let ny = header.ny() as usize;
        let width = header.sample_width();
        let expected = header.expected_payload_len();

        let bytes = match header.compression() {
            CompressionScheme::None => {
                read_exact_at(reader, header.data_start(), expected, "pixel payload")?
            }
            CompressionScheme::ImageCodec => {
                let encoded = read_to_end_from(reader, header.data_start(), "pixel payload")?;
                let decoded = self.codec.decode(&encoded, nx, ny, width)?;
                if decoded.len() != expected {
                    return Err(DecodeError::Decompression(format!(
                        "image codec produced {} bytes, expected {}",
                        decoded.len(),
                        expected
                    )));
                }
                decoded
            }
            CompressionScheme::RawDeflate => {
                let compressed = read_to_end_from(reader, header.data_start(), "pixel payload")?;
                inflate_with_resync(&compressed, nx, ny, width, cancel)?
            }
        };

        debug!(
            scheme = ?header.compression(),
            nx,
            ny,
            bytes = bytes.len(),
            "Decoded pixel payload"
        );
        SampleBuffer::new(nx, ny, width, bytes)
    }
}
