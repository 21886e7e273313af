use thiserror::Error;

/// Errors raised while building a navigator or reprojecting rectangles.
///
/// Points that fall off the visible disk are not errors; they are reported
/// as `NotVisible` values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Invalid navigation parameters: {0}")]
    InvalidParameters(String),

    #[error("Inconsistent bounding box: {0}")]
    BoundingBoxConsistency(String),
}
