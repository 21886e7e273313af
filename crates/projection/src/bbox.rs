//! Reprojection of geographic rectangles into scan-angle space.
//!
//! A rectangle partly outside the visible disk cannot be bounded by its
//! corners alone: the visible part extends to the limb. Synthetic points on
//! the limiting circle of radius `max_r` are added depending on which
//! corners the satellite can see.

use sat_common::{GeoRect, ProjectedRect};

use crate::{GeostationaryNavigator, ProjectionError, ScanPoint};

/// Projects [`GeoRect`]s into the view of one satellite.
#[derive(Debug, Clone)]
pub struct BoundingBoxProjector<'a> {
    navigator: &'a GeostationaryNavigator,
    max_r: f64,
}

impl<'a> BoundingBoxProjector<'a> {
    /// Projector using the navigator's own limiting circle.
    pub fn new(navigator: &'a GeostationaryNavigator) -> Self {
        Self {
            navigator,
            max_r: navigator.max_visible_radius(),
        }
    }

    /// Projector with an explicit limiting-circle radius (radians).
    pub fn with_max_radius(navigator: &'a GeostationaryNavigator, max_r: f64) -> Self {
        Self { navigator, max_r }
    }

    pub fn max_radius(&self) -> f64 {
        self.max_r
    }

    /// Scan-angle bounding box of the visible part of `rect`.
    ///
    /// Returns `Ok(None)` when no part of the rectangle is visible, and the
    /// whole limb square when the rectangle encloses the visible disk.
    pub fn project(&self, rect: &GeoRect) -> Result<Option<ProjectedRect>, ProjectionError> {
        let corner = |(lat, lon): (f64, f64)| match self.navigator.forward(lat, lon) {
            ScanPoint::Visible(s) => Some((s.x, s.y)),
            ScanPoint::NotVisible => None,
        };
        let corners = [
            corner(rect.lower_left()),
            corner(rect.upper_right()),
            corner(rect.lower_right()),
            corner(rect.upper_left()),
        ];
        let r = self.max_r;

        let mut points = limb_extent(corners, r).map_err(|e| {
            tracing::debug!(?rect, "inconsistent corner visibility");
            e
        })?;
        if points.is_empty() {
            let sub_lon = self.navigator.sub_lon();
            if rect.contains(0.0, sub_lon) {
                points = vec![(-r, -r), (r, r)];
            } else {
                tracing::debug!(?rect, sub_lon, "rectangle entirely outside the visible disk");
                return Ok(None);
            }
        }

        Ok(ProjectedRect::enclosing(points))
    }
}

/// Visible corners, in `ll, ur, lr, ul` order, extended with the points on
/// the limiting circle of radius `r` that bound the visible part.
///
/// Empty when no corner is visible.
fn limb_extent(
    corners: [Option<(f64, f64)>; 4],
    r: f64,
) -> Result<Vec<(f64, f64)>, ProjectionError> {
    let [ll, ur, lr, ul] = corners;
    let mut points: Vec<(f64, f64)> = corners.iter().flatten().copied().collect();

    match points.len() {
        2 => {
            let limb = match (ll, ur, lr, ul) {
                (Some(_), None, Some(_), None) => (0.0, r),
                (Some(_), None, None, Some(_)) => (r, 0.0),
                (None, Some(_), None, Some(_)) => (0.0, -r),
                (None, Some(_), Some(_), None) => (-r, 0.0),
                _ => {
                    return Err(ProjectionError::BoundingBoxConsistency(
                        "only diagonal corners are visible".to_string(),
                    ))
                }
            };
            points.push(limb);
        }
        1 => {
            let lim = |c: f64| (r * r - c * c).max(0.0).sqrt();
            match (ll, ur, lr, ul) {
                (Some((x, y)), ..) => {
                    points.push((x, lim(x)));
                    points.push((lim(y), y));
                }
                (_, Some((x, y)), ..) => {
                    points.push((x, -lim(x)));
                    points.push((-lim(y), y));
                }
                (_, _, Some((x, y)), _) => {
                    points.push((x, lim(x)));
                    points.push((-lim(y), y));
                }
                (_, _, _, Some((x, y))) => {
                    points.push((x, -lim(x)));
                    points.push((lim(y), y));
                }
                _ => {}
            }
        }
        _ => {}
    }
    Ok(points)
}
