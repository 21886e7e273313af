//! Geostationary satellite navigation.
//!
//! Converts between geographic coordinates and satellite scan angles for
//! both sweep conventions, and reprojects geographic rectangles into the
//! satellite's view.

pub mod bbox;
pub mod error;
pub mod geostationary;

pub use bbox::BoundingBoxProjector;
pub use error::ProjectionError;
pub use geostationary::{
    GeographicPoint, GeostationaryNavigator, GeostationaryParameters, LatLon, SatelliteHeight,
    ScanAngles, ScanGeometry, ScanPoint,
};
