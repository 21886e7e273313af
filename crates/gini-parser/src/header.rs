//! GINI product header decoding.
//!
//! A GINI file starts with a WMO heading (the 21-byte product
//! identification block) followed by the 512-byte product description
//! block (PDB). NOAAPORT also ships products whose heading and PDB are
//! wrapped in their own zlib stream; that stream repeats the WMO heading
//! once inflated.
//!
//! All multi-byte fields are big-endian. Offsets below are relative to the
//! start of the PDB.

use std::io::{Seek, SeekFrom};

use bytes::Buf;
use chrono::{DateTime, NaiveDate, Utc};
use flate2::{Decompress, FlushDecompress};
use projection::{GeostationaryNavigator, GeostationaryParameters};
use sat_common::{wrap_longitude, GeoRect};
use serde::Serialize;
use tracing::{debug, warn};

use crate::calibration::{parse_calibration_block, CalibrationTable};
use crate::payload::SampleWidth;
use crate::source::{read_exact_at, read_up_to, ByteSource};
use crate::{tables, wmo, DecodeError, Result};

/// Product identification block (WMO heading) length.
pub const PIB_LEN: usize = 21;
/// Product description block length.
pub const PDB_LEN: usize = 512;
/// Heading plus description block.
pub const HED_LEN: usize = PIB_LEN + PDB_LEN;
/// Bytes that must be present at the start of every product.
pub const MIN_WINDOW_LEN: usize = PIB_LEN + HED_LEN;

pub const IMAGE_RESOLUTION_OFFSET: usize = 41;
pub const COMPRESSION_FLAG_OFFSET: usize = 42;
/// Compression flag value marking an image-codec (PNG) payload.
pub const IMAGE_CODEC_FLAG: u8 = 128;

pub const PROJECTION_MERCATOR: u8 = 1;
pub const PROJECTION_LAMBERT: u8 = 3;
pub const PROJECTION_POLAR: u8 = 5;

/// Kilometres per degree of latitude used for the derived grid extent.
const KM_PER_DEGREE: f64 = 111.26;
/// Latitude of true scale for polar stereographic products.
const POLAR_TRUE_LATITUDE: f64 = 60.0;

/// Map projection of the raster grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectionType {
    Mercator,
    LambertConformal,
    PolarStereographic,
    GeostationaryGrid,
    Unsupported(u8),
}

impl ProjectionType {
    pub fn from_code(code: u8) -> Self {
        match code {
            PROJECTION_MERCATOR => ProjectionType::Mercator,
            PROJECTION_LAMBERT => ProjectionType::LambertConformal,
            PROJECTION_POLAR => ProjectionType::PolarStereographic,
            other => ProjectionType::Unsupported(other),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, ProjectionType::Unsupported(_))
    }
}

/// Projection centre for conformal grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pole {
    North,
    South,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MercatorParams {
    /// First grid point
    pub lat1: f64,
    pub lon1: f64,
    /// Last grid point
    pub lat2: f64,
    pub lon2: f64,
    /// Latitude of true scale
    pub latin: f64,
    /// Central meridian, midway between the first and last grid points
    pub lov: f64,
    pub scan_mode: u8,
}

/// Parameters shared by Lambert conformal and polar stereographic grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConformalParams {
    pub lat1: f64,
    pub lon1: f64,
    /// Approximate last grid point, derived from the grid spacing
    pub lat2: f64,
    pub lon2: f64,
    /// Orientation longitude
    pub lov: f64,
    pub dx_km: f64,
    pub dy_km: f64,
    pub latin: f64,
    pub pole: Pole,
    pub scan_mode: u8,
    /// Scale factor at the pole (polar stereographic only)
    pub image_scale: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ProjectionParameters {
    Mercator(MercatorParams),
    Conformal(ConformalParams),
    Geostationary(GeostationaryParameters),
    Unsupported,
}

/// Pixel payload encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CompressionScheme {
    #[default]
    None,
    ImageCodec,
    RawDeflate,
}

/// Decoded GINI product header. Immutable; built once per product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterProductHeader {
    source_id: u8,
    entity_id: u8,
    sector_id: u8,
    physical_element: u8,
    capture_time: DateTime<Utc>,
    projection: ProjectionType,
    projection_params: ProjectionParameters,
    nx: u16,
    ny: u16,
    image_resolution_km: u8,
    compression_flag: u8,
    sample_width: SampleWidth,
    compression: CompressionScheme,
    header_compressed: bool,
    data_start: u64,
    calibration: Option<CalibrationTable>,
}

impl RasterProductHeader {
    pub fn builder() -> RasterProductHeaderBuilder {
        RasterProductHeaderBuilder::default()
    }

    pub fn source_id(&self) -> u8 {
        self.source_id
    }

    pub fn entity_id(&self) -> u8 {
        self.entity_id
    }

    pub fn sector_id(&self) -> u8 {
        self.sector_id
    }

    pub fn physical_element(&self) -> u8 {
        self.physical_element
    }

    pub fn capture_time(&self) -> DateTime<Utc> {
        self.capture_time
    }

    pub fn projection(&self) -> ProjectionType {
        self.projection
    }

    pub fn projection_params(&self) -> &ProjectionParameters {
        &self.projection_params
    }

    pub fn nx(&self) -> u16 {
        self.nx
    }

    pub fn ny(&self) -> u16 {
        self.ny
    }

    pub fn image_resolution_km(&self) -> u8 {
        self.image_resolution_km
    }

    pub fn compression_flag(&self) -> u8 {
        self.compression_flag
    }

    pub fn sample_width(&self) -> SampleWidth {
        self.sample_width
    }

    pub fn compression(&self) -> CompressionScheme {
        self.compression
    }

    /// Whether the heading and description block were zlib-wrapped.
    pub fn header_compressed(&self) -> bool {
        self.header_compressed
    }

    /// Byte offset of the pixel payload.
    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    pub fn calibration(&self) -> Option<&CalibrationTable> {
        self.calibration.as_ref()
    }

    /// Payload size in bytes once decompressed.
    pub fn expected_payload_len(&self) -> usize {
        self.nx as usize * self.ny as usize * self.sample_width.bytes()
    }

    pub fn entity_name(&self) -> &'static str {
        tables::entity_name(self.entity_id)
    }

    pub fn sector_name(&self) -> &'static str {
        tables::sector_name(self.sector_id)
    }

    pub fn variable_name(&self) -> &'static str {
        tables::physical_element_id(self.physical_element, self.entity_id)
    }

    pub fn units(&self) -> &'static str {
        tables::physical_element_units(self.physical_element, self.entity_id)
    }

    /// Fails with `UnsupportedProduct` unless the grid projection is known.
    pub fn require_supported_projection(&self) -> Result<()> {
        match self.projection {
            ProjectionType::Unsupported(code) => Err(DecodeError::UnsupportedProduct(format!(
                "projection code {} is not supported",
                code
            ))),
            _ => Ok(()),
        }
    }

    /// Geographic rectangle spanned by the first and last grid points.
    pub fn geographic_extent(&self) -> Option<GeoRect> {
        let (lat1, lon1, lat2, lon2) = match &self.projection_params {
            ProjectionParameters::Mercator(p) => (p.lat1, p.lon1, p.lat2, p.lon2),
            ProjectionParameters::Conformal(p) => (p.lat1, p.lon1, p.lat2, p.lon2),
            ProjectionParameters::Geostationary(_) | ProjectionParameters::Unsupported => {
                return None
            }
        };
        GeoRect::spanning(lat1, lon1, lat2, lon2).ok()
    }

    /// Navigator for geostationary grids.
    pub fn navigator(&self) -> Option<GeostationaryNavigator> {
        match self.projection_params {
            ProjectionParameters::Geostationary(params) => GeostationaryNavigator::new(params).ok(),
            _ => None,
        }
    }
}

/// Collects header fields and emits one validated [`RasterProductHeader`].
#[derive(Debug, Clone, Default)]
pub struct RasterProductHeaderBuilder {
    source_id: u8,
    entity_id: u8,
    sector_id: u8,
    physical_element: u8,
    capture_time: Option<DateTime<Utc>>,
    projection: Option<ProjectionType>,
    projection_params: Option<ProjectionParameters>,
    nx: u16,
    ny: u16,
    image_resolution_km: u8,
    compression_flag: u8,
    sample_width: SampleWidth,
    compression: CompressionScheme,
    header_compressed: bool,
    data_start: u64,
    calibration: Option<CalibrationTable>,
}

impl RasterProductHeaderBuilder {
    pub fn source_id(mut self, id: u8) -> Self {
        self.source_id = id;
        self
    }

    pub fn entity_id(mut self, id: u8) -> Self {
        self.entity_id = id;
        self
    }

    pub fn sector_id(mut self, id: u8) -> Self {
        self.sector_id = id;
        self
    }

    pub fn physical_element(mut self, element: u8) -> Self {
        self.physical_element = element;
        self
    }

    pub fn capture_time(mut self, time: DateTime<Utc>) -> Self {
        self.capture_time = Some(time);
        self
    }

    pub fn projection(mut self, projection: ProjectionType, params: ProjectionParameters) -> Self {
        self.projection = Some(projection);
        self.projection_params = Some(params);
        self
    }

    pub fn dimensions(mut self, nx: u16, ny: u16) -> Self {
        self.nx = nx;
        self.ny = ny;
        self
    }

    pub fn image_resolution_km(mut self, km: u8) -> Self {
        self.image_resolution_km = km;
        self
    }

    pub fn compression_flag(mut self, flag: u8) -> Self {
        self.compression_flag = flag;
        self
    }

    pub fn sample_width(mut self, width: SampleWidth) -> Self {
        self.sample_width = width;
        self
    }

    pub fn compression(mut self, scheme: CompressionScheme) -> Self {
        self.compression = scheme;
        self
    }

    pub fn header_compressed(mut self, compressed: bool) -> Self {
        self.header_compressed = compressed;
        self
    }

    pub fn data_start(mut self, offset: u64) -> Self {
        self.data_start = offset;
        self
    }

    pub fn calibration(mut self, table: Option<CalibrationTable>) -> Self {
        self.calibration = table;
        self
    }

    pub fn build(self) -> Result<RasterProductHeader> {
        let capture_time = self
            .capture_time
            .ok_or_else(|| DecodeError::Format("capture time not set".to_string()))?;
        let projection = self
            .projection
            .ok_or_else(|| DecodeError::Format("projection not set".to_string()))?;
        let projection_params = self.projection_params.unwrap_or(ProjectionParameters::Unsupported);

        if self.nx == 0 || self.ny == 0 {
            return Err(DecodeError::Format(format!(
                "grid dimensions must be positive, got {}x{}",
                self.nx, self.ny
            )));
        }

        let consistent = match (&projection, &projection_params) {
            (ProjectionType::Mercator, ProjectionParameters::Mercator(_)) => true,
            (
                ProjectionType::LambertConformal | ProjectionType::PolarStereographic,
                ProjectionParameters::Conformal(_),
            ) => true,
            (ProjectionType::GeostationaryGrid, ProjectionParameters::Geostationary(p)) => {
                p.validate()
                    .map_err(|e| DecodeError::Format(e.to_string()))?;
                true
            }
            (ProjectionType::Unsupported(_), ProjectionParameters::Unsupported) => true,
            _ => false,
        };
        if !consistent {
            return Err(DecodeError::Format(format!(
                "projection parameters {:?} do not match projection {:?}",
                projection_params, projection
            )));
        }

        Ok(RasterProductHeader {
            source_id: self.source_id,
            entity_id: self.entity_id,
            sector_id: self.sector_id,
            physical_element: self.physical_element,
            capture_time,
            projection,
            projection_params,
            nx: self.nx,
            ny: self.ny,
            image_resolution_km: self.image_resolution_km,
            compression_flag: self.compression_flag,
            sample_width: self.sample_width,
            compression: self.compression,
            header_compressed: self.header_compressed,
            data_start: self.data_start,
            calibration: self.calibration,
        })
    }
}

/// Where the description block was found.
struct PdbLocation {
    pdb: [u8; PDB_LEN],
    data_start: u64,
    compressed: bool,
}

/// Decodes GINI product headers from a seekable source.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderDecoder;

impl HeaderDecoder {
    /// Decode the header, including the calibration table when present.
    ///
    /// Unsupported projections still produce a header; see
    /// [`RasterProductHeader::require_supported_projection`].
    pub fn decode<R: ByteSource + ?Sized>(reader: &mut R) -> Result<RasterProductHeader> {
        reader.seek(SeekFrom::Start(0))?;
        let mut window = [0u8; MIN_WINDOW_LEN];
        let available = read_up_to(reader, &mut window)?;
        if available < MIN_WINDOW_LEN {
            return Err(DecodeError::TruncatedInput {
                stage: "product header",
                needed: MIN_WINDOW_LEN as u64,
                available: available as u64,
            });
        }

        let location = locate_pdb(reader, &window)?;
        let compression = detect_compression(reader, &location.pdb, location.data_start)?;

        debug!(
            data_start = location.data_start,
            header_compressed = location.compressed,
            ?compression,
            "Located GINI product description block"
        );

        parse_description_block(&location.pdb)?
            .header_compressed(location.compressed)
            .data_start(location.data_start)
            .compression(compression)
            .build()
    }
}

fn locate_pdb<R: ByteSource + ?Sized>(reader: &mut R, window: &[u8]) -> Result<PdbLocation> {
    let outer = wmo::find_header_start(window)?;
    let header_start = outer.unwrap_or(0);

    if !wmo::starts_with_zlib_header(&window[header_start..]) {
        if outer.is_none() {
            return Err(DecodeError::Format(
                "no KNES or CHIZ WMO heading found".to_string(),
            ));
        }
        let block = read_exact_at(reader, header_start as u64, PDB_LEN, "product description block")?;
        let mut pdb = [0u8; PDB_LEN];
        pdb.copy_from_slice(&block);
        return Ok(PdbLocation {
            pdb,
            data_start: (header_start + PDB_LEN) as u64,
            compressed: false,
        });
    }

    reader.seek(SeekFrom::Start(header_start as u64))?;
    let mut input = vec![0u8; HED_LEN];
    let n = read_up_to(reader, &mut input)?;
    input.truncate(n);

    let (inflated, consumed) = inflate_header(&input)?;
    let inner = wmo::find_header_start(&inflated)?;
    if outer.is_none() && inner.is_none() {
        return Err(DecodeError::Format(
            "no WMO heading in the raw or inflated header".to_string(),
        ));
    }

    let inner = inner.unwrap_or(0);
    let block = inflated
        .get(inner..inner + PDB_LEN)
        .ok_or(DecodeError::TruncatedInput {
            stage: "inflated product header",
            needed: (inner + PDB_LEN) as u64,
            available: inflated.len() as u64,
        })?;
    let mut pdb = [0u8; PDB_LEN];
    pdb.copy_from_slice(block);

    Ok(PdbLocation {
        pdb,
        data_start: (header_start + consumed) as u64,
        compressed: true,
    })
}

/// Inflate a zlib-wrapped heading and description block.
///
/// Returns the inflated bytes and the number of input bytes consumed.
fn inflate_header(input: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut inflater = Decompress::new(true);
    // Headroom lets the inflater reach the stream trailer
    let mut out = Vec::with_capacity(2 * HED_LEN);
    inflater
        .decompress_vec(input, &mut out, FlushDecompress::None)
        .map_err(|e| DecodeError::Decompression(format!("product header: {}", e)))?;

    if out.len() != HED_LEN {
        warn!(
            inflated = out.len(),
            expected = HED_LEN,
            "Unexpected inflated product header size"
        );
    }
    Ok((out, inflater.total_in() as usize))
}

fn detect_compression<R: ByteSource + ?Sized>(
    reader: &mut R,
    pdb: &[u8; PDB_LEN],
    data_start: u64,
) -> Result<CompressionScheme> {
    if pdb[COMPRESSION_FLAG_OFFSET] == IMAGE_CODEC_FLAG {
        return Ok(CompressionScheme::ImageCodec);
    }

    reader.seek(SeekFrom::Start(data_start))?;
    let mut lead = [0u8; 2];
    let n = read_up_to(reader, &mut lead)?;
    if n == lead.len() && wmo::is_zlib_header(lead[0], lead[1]) {
        Ok(CompressionScheme::RawDeflate)
    } else {
        Ok(CompressionScheme::None)
    }
}

/// Read a 3-byte sign-magnitude value scaled by 10000.
fn scaled_int(pdb: &[u8; PDB_LEN], offset: usize) -> f64 {
    let mut buf = &pdb[offset..offset + 3];
    let high = buf.get_u16();
    let low = buf.get_u8();
    let magnitude = (((high & 0x7FFF) as u32) << 8) | low as u32;
    let sign = if high & 0x8000 != 0 { -1.0 } else { 1.0 };
    sign * magnitude as f64 / 10000.0
}

fn parse_capture_time(fields: [u8; 6]) -> Result<DateTime<Utc>> {
    let [year, month, day, hour, minute, second] = fields;
    let year = year as i32 + if year < 50 { 2000 } else { 1900 };
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second as u32))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .ok_or_else(|| {
            DecodeError::Format(format!(
                "invalid capture time {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ))
        })
}

fn parse_mercator(pdb: &[u8; PDB_LEN]) -> MercatorParams {
    let lat1 = scaled_int(pdb, 20);
    let lon1 = scaled_int(pdb, 23);
    let lat2 = scaled_int(pdb, 27);
    let lon2 = scaled_int(pdb, 30);
    let latin = scaled_int(pdb, 38);

    let east = |lon: f64| if lon < 0.0 { lon + 360.0 } else { lon };
    let (lon_1, lon_2) = (east(lon1), east(lon2));
    let lov = wrap_longitude(lon_1 - (lon_1 - lon_2) / 2.0);

    MercatorParams {
        lat1,
        lon1,
        lat2,
        lon2,
        latin,
        lov,
        scan_mode: pdb[37],
    }
}

fn parse_conformal(pdb: &[u8; PDB_LEN], projection: ProjectionType, nx: u16, ny: u16) -> ConformalParams {
    let lat1 = scaled_int(pdb, 20);
    let lon1 = scaled_int(pdb, 23);
    let lov = scaled_int(pdb, 27);
    let dx_km = scaled_int(pdb, 30);
    let dy_km = scaled_int(pdb, 33);
    let pole = if pdb[36] > 127 { Pole::South } else { Pole::North };
    let latin = scaled_int(pdb, 38);

    let image_scale = (projection == ProjectionType::PolarStereographic)
        .then(|| (1.0 + POLAR_TRUE_LATITUDE.to_radians().sin()) / 2.0);

    // Rough extent: spacing converted to degrees along the first row and column
    let lat2 = lat1 + dy_km * (ny as f64 - 1.0) / KM_PER_DEGREE;
    let lon1_east = if lon1 < 0.0 { lon1 + 360.0 } else { lon1 };
    let lon2_east =
        lon1_east + dx_km * (nx as f64 - 1.0) / KM_PER_DEGREE * lat1.to_radians().cos();

    ConformalParams {
        lat1,
        lon1,
        lat2,
        lon2: wrap_longitude(lon2_east),
        lov: wrap_longitude(lov),
        dx_km,
        dy_km,
        latin,
        pole,
        scan_mode: pdb[37],
        image_scale,
    }
}

/// Parse the fixed fields of a product description block.
///
/// The returned builder still needs the data offset and compression scheme,
/// which depend on where the block sat in the file.
pub fn parse_description_block(pdb: &[u8; PDB_LEN]) -> Result<RasterProductHeaderBuilder> {
    let mut buf = &pdb[..];
    let source_id = buf.get_u8();
    let entity_id = buf.get_u8();
    let sector_id = buf.get_u8();
    let physical_element = buf.get_u8();
    buf.advance(4);

    let mut time_fields = [0u8; 6];
    buf.copy_to_slice(&mut time_fields);
    buf.advance(1); // hundredths of a second
    let capture_time = parse_capture_time(time_fields)?;

    let projection_code = buf.get_u8();
    let nx = buf.get_u16();
    let ny = buf.get_u16();

    let projection = ProjectionType::from_code(projection_code);
    let params = match projection {
        ProjectionType::Mercator => ProjectionParameters::Mercator(parse_mercator(pdb)),
        ProjectionType::LambertConformal | ProjectionType::PolarStereographic => {
            ProjectionParameters::Conformal(parse_conformal(pdb, projection, nx, ny))
        }
        _ => {
            warn!(code = projection_code, "Unsupported GINI projection");
            ProjectionParameters::Unsupported
        }
    };

    let precipitation = tables::is_precipitation(physical_element, entity_id);

    Ok(RasterProductHeader::builder()
        .source_id(source_id)
        .entity_id(entity_id)
        .sector_id(sector_id)
        .physical_element(physical_element)
        .capture_time(capture_time)
        .projection(projection, params)
        .dimensions(nx, ny)
        .image_resolution_km(pdb[IMAGE_RESOLUTION_OFFSET])
        .compression_flag(pdb[COMPRESSION_FLAG_OFFSET])
        .sample_width(SampleWidth::One)
        .calibration(parse_calibration_block(pdb, precipitation)))
}

/// Convenience wrapper for in-memory products.
pub fn decode_header_bytes(data: &[u8]) -> Result<RasterProductHeader> {
    HeaderDecoder::decode(&mut std::io::Cursor::new(data))
}
