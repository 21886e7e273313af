//! Rectangle types for geographic and scan-angle space.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in geographic coordinates (degrees).
///
/// Longitudes are expected in `[-180, 180]` with `min_lon <= max_lon`;
/// rectangles crossing the antimeridian are not represented.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRect {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GeoRect {
    /// Create a rectangle from its corner coordinates.
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Result<Self, RectError> {
        if !(min_lat.is_finite() && min_lon.is_finite() && max_lat.is_finite() && max_lon.is_finite())
        {
            return Err(RectError::NonFinite);
        }
        if min_lat > max_lat || min_lon > max_lon {
            return Err(RectError::Inverted(format!(
                "lat {}..{}, lon {}..{}",
                min_lat, max_lat, min_lon, max_lon
            )));
        }
        if min_lat < -90.0 || max_lat > 90.0 {
            return Err(RectError::OutOfRange(format!("lat {}..{}", min_lat, max_lat)));
        }

        Ok(Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        })
    }

    /// Smallest rectangle containing both points, in any order.
    pub fn spanning(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<Self, RectError> {
        Self::new(lat1.min(lat2), lon1.min(lon2), lat1.max(lat2), lon1.max(lon2))
    }

    /// Lower-left corner as `(lat, lon)`.
    pub fn lower_left(&self) -> (f64, f64) {
        (self.min_lat, self.min_lon)
    }

    /// Upper-right corner as `(lat, lon)`.
    pub fn upper_right(&self) -> (f64, f64) {
        (self.max_lat, self.max_lon)
    }

    /// Lower-right corner as `(lat, lon)`.
    pub fn lower_right(&self) -> (f64, f64) {
        (self.min_lat, self.max_lon)
    }

    /// Upper-left corner as `(lat, lon)`.
    pub fn upper_left(&self) -> (f64, f64) {
        (self.max_lat, self.min_lon)
    }

    /// Check if a point is contained within this rectangle (edges included).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// An axis-aligned rectangle in projected scan-angle space (radians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ProjectedRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounding rectangle of a set of points. `None` for an empty set.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut rect = Self::new(x0, y0, x0, y0);
        for (x, y) in iter {
            rect.min_x = rect.min_x.min(x);
            rect.min_y = rect.min_y.min(y);
            rect.max_x = rect.max_x.max(x);
            rect.max_y = rect.max_y.max(y);
        }
        Some(rect)
    }

    /// Width of the rectangle in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the rectangle in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if a point is contained within this rectangle.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RectError {
    #[error("Rectangle coordinates must be finite")]
    NonFinite,

    #[error("Rectangle min exceeds max: {0}")]
    Inverted(String),

    #[error("Latitude outside [-90, 90]: {0}")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_rect_corners() {
        let rect = GeoRect::new(20.0, -130.0, 50.0, -60.0).unwrap();
        assert_eq!(rect.lower_left(), (20.0, -130.0));
        assert_eq!(rect.upper_right(), (50.0, -60.0));
        assert_eq!(rect.lower_right(), (20.0, -60.0));
        assert_eq!(rect.upper_left(), (50.0, -130.0));
        assert!(rect.contains(35.0, -95.0));
        assert!(!rect.contains(10.0, -95.0));
    }

    #[test]
    fn test_geo_rect_rejects_bad_input() {
        assert!(matches!(
            GeoRect::new(50.0, 0.0, 20.0, 10.0),
            Err(RectError::Inverted(_))
        ));
        assert_eq!(
            GeoRect::new(f64::NAN, 0.0, 20.0, 10.0),
            Err(RectError::NonFinite)
        );
        assert!(matches!(
            GeoRect::new(-95.0, 0.0, 20.0, 10.0),
            Err(RectError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_spanning_orders_points() {
        let rect = GeoRect::spanning(45.0, -70.0, 25.0, -120.0).unwrap();
        assert_eq!(rect, GeoRect::new(25.0, -120.0, 45.0, -70.0).unwrap());
    }

    #[test]
    fn test_enclosing() {
        let rect =
            ProjectedRect::enclosing([(0.1, -0.2), (-0.05, 0.3), (0.0, 0.0)]).unwrap();
        assert_eq!(rect, ProjectedRect::new(-0.05, -0.2, 0.1, 0.3));
        assert!((rect.width() - 0.15).abs() < 1e-12);
        assert!((rect.height() - 0.5).abs() < 1e-12);
        assert!(ProjectedRect::enclosing(std::iter::empty()).is_none());
    }

    #[test]
    fn test_serde_shape() {
        let rect = ProjectedRect::new(-0.1, -0.1, 0.1, 0.1);
        let json = serde_json::to_value(rect).unwrap();
        assert_eq!(json["min_x"], -0.1);
        assert_eq!(json["max_y"], 0.1);
    }
}
