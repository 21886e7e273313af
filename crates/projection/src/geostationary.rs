//! Geostationary satellite projection.
//!
//! The satellite views Earth from a fixed position above the equator and
//! image coordinates are scan angles in radians from nadir. Two sweep
//! conventions are in use:
//!
//! - GEOS (Meteosat, Himawari): the instrument sweeps along y, so
//!   `x = atan(-r2 / r1)` and `y = asin(r3 / |r|)`.
//! - GOES (GOES-R series): the instrument sweeps along x, so
//!   `x = asin(-r2 / |r|)` and `y = atan(r3 / r1)`.
//!
//! Reference: CGMS 03 LRIT/HRIT Global Specification, section 4.4, and
//! GOES-R Product Definition and Users' Guide (PUG) Volume 4.

use std::fmt;
use std::str::FromStr;

use sat_common::wrap_longitude;
use serde::{Deserialize, Serialize};

use crate::ProjectionError;

/// GRS80 equatorial radius (km).
pub const GRS80_REQ_KM: f64 = 6378.137;
/// GRS80 inverse flattening.
pub const GRS80_INV_FLATTENING: f64 = 298.257222101;
/// WGS84 equatorial radius (km).
pub const WGS84_REQ_KM: f64 = 6378.137;
/// WGS84 inverse flattening.
pub const WGS84_INV_FLATTENING: f64 = 298.257223563;
/// Nominal geostationary altitude above the equator (km).
pub const GEOSTATIONARY_ALTITUDE_KM: f64 = 35786.023;

/// Instrument sweep convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanGeometry {
    /// Sweep along y (Meteosat, Himawari).
    Geos,
    /// Sweep along x (GOES-R series).
    Goes,
}

impl fmt::Display for ScanGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanGeometry::Geos => write!(f, "geos"),
            ScanGeometry::Goes => write!(f, "goes"),
        }
    }
}

impl FromStr for ScanGeometry {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "geos" | "y" => Ok(ScanGeometry::Geos),
            "goes" | "x" => Ok(ScanGeometry::Goes),
            other => Err(ProjectionError::InvalidParameters(format!(
                "unknown sweep convention '{}'",
                other
            ))),
        }
    }
}

/// Satellite height, either above the ellipsoid surface or from Earth's center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SatelliteHeight {
    AboveEllipsoid(f64),
    Geocentric(f64),
}

/// Parameters of a geostationary view.
///
/// Distances are in kilometres, the sub-satellite longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeostationaryParameters {
    /// Longitude of the sub-satellite point (degrees, east positive)
    pub sub_lon: f64,
    /// Equatorial radius (km)
    pub req_km: f64,
    /// Polar radius (km)
    pub rpol_km: f64,
    pub height: SatelliteHeight,
    pub sweep: ScanGeometry,
}

impl GeostationaryParameters {
    /// Build parameters from an equatorial radius and inverse flattening.
    pub fn from_inverse_flattening(
        sub_lon: f64,
        req_km: f64,
        inv_flattening: f64,
        height: SatelliteHeight,
        sweep: ScanGeometry,
    ) -> Self {
        let rpol_km = req_km * (1.0 - 1.0 / inv_flattening);
        Self {
            sub_lon,
            req_km,
            rpol_km,
            height,
            sweep,
        }
    }

    /// GRS80 ellipsoid at the nominal geostationary altitude.
    pub fn grs80(sub_lon: f64, sweep: ScanGeometry) -> Self {
        Self::from_inverse_flattening(
            sub_lon,
            GRS80_REQ_KM,
            GRS80_INV_FLATTENING,
            SatelliteHeight::AboveEllipsoid(GEOSTATIONARY_ALTITUDE_KM),
            sweep,
        )
    }

    /// WGS84 ellipsoid at the nominal geostationary altitude.
    pub fn wgs84(sub_lon: f64, sweep: ScanGeometry) -> Self {
        Self::from_inverse_flattening(
            sub_lon,
            WGS84_REQ_KM,
            WGS84_INV_FLATTENING,
            SatelliteHeight::AboveEllipsoid(GEOSTATIONARY_ALTITUDE_KM),
            sweep,
        )
    }

    /// Meteosat Second Generation at 0°, using the MSG reference ellipsoid.
    pub fn msg() -> Self {
        Self {
            sub_lon: 0.0,
            req_km: 6378.169,
            rpol_km: 6356.5838,
            height: SatelliteHeight::Geocentric(42164.0),
            sweep: ScanGeometry::Geos,
        }
    }

    /// GOES-East operational position (75.2°W is nominal; 75°W is used by the GRB grids).
    pub fn goes_east() -> Self {
        Self::grs80(-75.0, ScanGeometry::Goes)
    }

    /// GOES-West operational position (137.2°W).
    pub fn goes_west() -> Self {
        Self::grs80(-137.2, ScanGeometry::Goes)
    }

    /// Distance from Earth's center to the satellite (km).
    pub fn geocentric_height(&self) -> f64 {
        match self.height {
            SatelliteHeight::AboveEllipsoid(h) => h + self.req_km,
            SatelliteHeight::Geocentric(h) => h,
        }
    }

    /// Check the parameters describe a physical view.
    pub fn validate(&self) -> Result<(), ProjectionError> {
        if !self.sub_lon.is_finite() {
            return Err(ProjectionError::InvalidParameters(
                "sub-satellite longitude must be finite".to_string(),
            ));
        }
        if !(self.req_km.is_finite() && self.req_km > 0.0) {
            return Err(ProjectionError::InvalidParameters(format!(
                "equatorial radius must be positive, got {}",
                self.req_km
            )));
        }
        if !(self.rpol_km.is_finite() && self.rpol_km > 0.0 && self.rpol_km <= self.req_km) {
            return Err(ProjectionError::InvalidParameters(format!(
                "polar radius must be in (0, {}], got {}",
                self.req_km, self.rpol_km
            )));
        }
        let h = self.geocentric_height();
        if !(h.is_finite() && h > self.req_km) {
            return Err(ProjectionError::InvalidParameters(format!(
                "satellite must orbit above the surface, geocentric height {} km",
                h
            )));
        }
        Ok(())
    }
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Scan angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanAngles {
    pub x: f64,
    pub y: f64,
}

/// Result of converting scan angles to geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeographicPoint {
    Visible(LatLon),
    NotVisible,
}

impl GeographicPoint {
    pub fn visible(self) -> Option<LatLon> {
        match self {
            GeographicPoint::Visible(p) => Some(p),
            GeographicPoint::NotVisible => None,
        }
    }
}

/// Result of converting geographic coordinates to scan angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanPoint {
    Visible(ScanAngles),
    NotVisible,
}

impl ScanPoint {
    pub fn visible(self) -> Option<ScanAngles> {
        match self {
            ScanPoint::Visible(p) => Some(p),
            ScanPoint::NotVisible => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, ScanPoint::Visible(_))
    }
}

/// Forward and inverse navigation for one geostationary view.
///
/// Immutable after construction and safe to share between threads.
/// Two navigators compare equal when they share the sub-satellite
/// longitude and sweep convention.
#[derive(Debug, Clone)]
pub struct GeostationaryNavigator {
    params: GeostationaryParameters,
    /// Geocentric satellite distance (km)
    h: f64,
    /// Sub-satellite longitude (radians)
    lambda_0: f64,
    /// (Req / Rpol)^2
    radius_ratio_sq: f64,
    /// h^2 - Req^2
    d: f64,
    /// First eccentricity squared
    e2: f64,
}

impl GeostationaryNavigator {
    pub fn new(params: GeostationaryParameters) -> Result<Self, ProjectionError> {
        params.validate()?;

        let params = GeostationaryParameters {
            sub_lon: wrap_longitude(params.sub_lon),
            ..params
        };
        let h = params.geocentric_height();
        let ratio = params.req_km / params.rpol_km;

        Ok(Self {
            params,
            h,
            lambda_0: params.sub_lon.to_radians(),
            radius_ratio_sq: ratio * ratio,
            d: h * h - params.req_km * params.req_km,
            e2: 1.0 - (params.rpol_km / params.req_km).powi(2),
        })
    }

    pub fn parameters(&self) -> &GeostationaryParameters {
        &self.params
    }

    pub fn sub_lon(&self) -> f64 {
        self.params.sub_lon
    }

    pub fn sweep(&self) -> ScanGeometry {
        self.params.sweep
    }

    /// Scan-angle radius of the limiting circle, shrunk by 1% so points on
    /// it still navigate to the surface.
    pub fn max_visible_radius(&self) -> f64 {
        0.99 * (self.params.req_km / self.h).asin()
    }

    /// Convert geographic coordinates (degrees) to scan angles (radians).
    ///
    /// Points on the far side of the Earth, beyond the limb, or with
    /// `|lat| > 90` are `NotVisible`.
    pub fn forward(&self, lat_deg: f64, lon_deg: f64) -> ScanPoint {
        if !(lat_deg.is_finite() && lon_deg.is_finite()) || lat_deg.abs() > 90.0 {
            return ScanPoint::NotVisible;
        }

        let lat = lat_deg.to_radians();
        let dlon = wrap_longitude(lon_deg).to_radians() - self.lambda_0;

        // Geocentric latitude and distance from Earth center to the surface point
        let rpol = self.params.rpol_km;
        let phi_c = (lat.tan() / self.radius_ratio_sq).atan();
        let cos_phi_c = phi_c.cos();
        let re = rpol / (1.0 - self.e2 * cos_phi_c * cos_phi_c).sqrt();

        let surface_x = re * cos_phi_c * dlon.cos();
        let r1 = self.h - surface_x;
        let r2 = -re * cos_phi_c * dlon.sin();
        let r3 = re * phi_c.sin();

        if r1 > self.h {
            return ScanPoint::NotVisible;
        }

        // Line of sight must meet the surface from outside
        let dot = r1 * surface_x - r2 * r2 - r3 * r3 * self.radius_ratio_sq;
        if dot <= 0.0 {
            return ScanPoint::NotVisible;
        }

        let rn = (r1 * r1 + r2 * r2 + r3 * r3).sqrt();
        let (x, y) = match self.params.sweep {
            ScanGeometry::Geos => ((-r2 / r1).atan(), (r3 / rn).asin()),
            ScanGeometry::Goes => ((-r2 / rn).asin(), (r3 / r1).atan()),
        };

        if !(x.is_finite() && y.is_finite()) {
            return ScanPoint::NotVisible;
        }
        ScanPoint::Visible(ScanAngles { x, y })
    }

    /// Convert scan angles (radians) to geographic coordinates (degrees).
    ///
    /// Scan angles whose line of sight misses the Earth are `NotVisible`.
    pub fn inverse(&self, x: f64, y: f64) -> GeographicPoint {
        if !(x.is_finite() && y.is_finite()) {
            return GeographicPoint::NotVisible;
        }

        let (x, y) = match self.params.sweep {
            ScanGeometry::Geos => (x, y),
            ScanGeometry::Goes => {
                // Re-express as GEOS angles of the same line of sight
                let theta = (y.sin() * x.cos()).asin();
                let lambda = (x.tan() / y.cos()).atan();
                (lambda, theta)
            }
        };

        let (sin_x, cos_x) = x.sin_cos();
        let (sin_y, cos_y) = y.sin_cos();

        let q = cos_y * cos_y + self.radius_ratio_sq * sin_y * sin_y;
        let c1 = (self.h * cos_x * cos_y).powi(2);
        let c2 = q * self.d;
        if c1 - c2 < 0.0 {
            return GeographicPoint::NotVisible;
        }

        let sn = (self.h * cos_x * cos_y - (c1 - c2).sqrt()) / q;
        let s1 = self.h - sn * cos_x * cos_y;
        let s2 = sn * sin_x * cos_y;
        let s3 = -sn * sin_y;
        let sxy = s1.hypot(s2);

        let lon = s2.atan2(s1) + self.lambda_0;
        let lat = (-self.radius_ratio_sq * s3 / sxy).atan();

        let lat = lat.to_degrees();
        let lon = wrap_longitude(lon.to_degrees());
        if !(lat.is_finite() && lon.is_finite()) {
            return GeographicPoint::NotVisible;
        }
        GeographicPoint::Visible(LatLon { lat, lon })
    }
}

impl PartialEq for GeostationaryNavigator {
    fn eq(&self, other: &Self) -> bool {
        self.params.sub_lon == other.params.sub_lon && self.params.sweep == other.params.sweep
    }
}
