//! Lossless image codec used by compression flag 128.

use image::GenericImageView;

use crate::payload::SampleWidth;
use crate::{DecodeError, Result};

/// Decodes an embedded image into raw big-endian samples.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, encoded: &[u8], nx: usize, ny: usize, width: SampleWidth)
        -> Result<Vec<u8>>;
}

/// Codec backed by the `image` crate (PNG in practice).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn decode(
        &self,
        encoded: &[u8],
        nx: usize,
        ny: usize,
        width: SampleWidth,
    ) -> Result<Vec<u8>> {
        let img = image::load_from_memory(encoded)
            .map_err(|e| DecodeError::Decompression(format!("image codec: {}", e)))?;

        let (w, h) = img.dimensions();
        if w as usize != nx || h as usize != ny {
            return Err(DecodeError::Decompression(format!(
                "embedded image is {}x{}, header declares {}x{}",
                w, h, nx, ny
            )));
        }

        match width {
            SampleWidth::One => Ok(img.into_luma8().into_raw()),
            SampleWidth::Two => Ok(img
                .into_luma16()
                .into_raw()
                .into_iter()
                .flat_map(u16::to_be_bytes)
                .collect()),
            SampleWidth::Four => Err(DecodeError::Decompression(
                "image codec does not carry 4-byte samples".to_string(),
            )),
        }
    }
}
