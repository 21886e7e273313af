//! GINI satellite raster decoder.
//!
//! Decodes NOAAPORT GINI products: the WMO-wrapped header and product
//! description block, the pixel payload under any of its three storage
//! schemes, and the optional calibration table mapping raw counts to
//! physical values.
//!
//! # Example
//!
//! ```no_run
//! use gini_parser::{decode_product, DecodeOptions};
//! use std::fs::File;
//!
//! let mut file = File::open("tige01.gini")?;
//! let product = decode_product(&mut file, &DecodeOptions::default())?;
//! println!("{} {}x{}", product.header.variable_name(), product.header.nx(), product.header.ny());
//! # Ok::<(), gini_parser::DecodeError>(())
//! ```

pub mod calibration;
pub mod error;
pub mod header;
pub mod payload;
pub mod product;
pub mod source;
pub mod tables;
pub mod wmo;

pub use calibration::{CalibrationBreakpoint, CalibrationMapper, CalibrationTable, CalibrationUnit};
pub use error::{DecodeError, Result};
pub use header::{
    decode_header_bytes, CompressionScheme, ConformalParams, HeaderDecoder, MercatorParams, Pole,
    ProjectionParameters, ProjectionType, RasterProductHeader, RasterProductHeaderBuilder,
};
pub use payload::{ImageCodec, ImageCrateCodec, PixelPayloadDecoder, SampleBuffer, SampleWidth};
pub use product::{decode_product, DecodeOptions, GiniProduct};
pub use source::ByteSource;
