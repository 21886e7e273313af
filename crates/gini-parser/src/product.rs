//! One-shot decoding of a complete product.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::calibration::CalibrationMapper;
use crate::header::{HeaderDecoder, RasterProductHeader};
use crate::payload::{ImageCodec, PixelPayloadDecoder, SampleBuffer, SampleWidth};
use crate::source::ByteSource;
use crate::Result;

/// Options for [`decode_product`].
#[derive(Clone, Default)]
pub struct DecodeOptions {
    pub cancel: CancellationToken,
    /// Replaces the default `image`-crate codec for flag-128 payloads.
    pub codec: Option<Arc<dyn ImageCodec>>,
}

impl DecodeOptions {
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Default::default()
        }
    }
}

/// A decoded product. `values` is present iff the header carried a
/// calibration table.
#[derive(Debug, Clone)]
pub struct GiniProduct {
    pub header: RasterProductHeader,
    pub samples: SampleBuffer,
    pub values: Option<Vec<f32>>,
}

struct SharedCodec(Arc<dyn ImageCodec>);

impl ImageCodec for SharedCodec {
    fn decode(
        &self,
        encoded: &[u8],
        nx: usize,
        ny: usize,
        width: SampleWidth,
    ) -> Result<Vec<u8>> {
        self.0.decode(encoded, nx, ny, width)
    }
}

/// Decode header, payload and calibrated values.
///
/// Fails with `UnsupportedProduct` before touching the payload when the
/// grid projection is unknown.
pub fn decode_product<R: ByteSource + ?Sized>(
    reader: &mut R,
    options: &DecodeOptions,
) -> Result<GiniProduct> {
    let header = HeaderDecoder::decode(reader)?;
    header.require_supported_projection()?;

    let decoder = match &options.codec {
        Some(codec) => PixelPayloadDecoder::with_codec(SharedCodec(Arc::clone(codec))),
        None => PixelPayloadDecoder::default(),
    };
    let samples = decoder.decode(reader, &header, &options.cancel)?;

    let values = header
        .calibration()
        .map(|table| CalibrationMapper::apply(&samples, table));

    debug!(
        variable = header.variable_name(),
        calibrated = values.is_some(),
        "Decoded GINI product"
    );

    Ok(GiniProduct {
        header,
        samples,
        values,
    })
}
