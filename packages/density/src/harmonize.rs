//! CRS harmonization of the point layer.
//!
//! Containment only means something when both layers share a CRS, so the
//! point layer is reprojected into the parcel layer's CRS before the join.

use dev_density_models::Crs;
use dev_density_spatial::Reprojector;

use crate::DensityError;
use crate::layer::PointLayer;

/// Reprojects `points` into `target` when their CRS differs.
///
/// A layer without a declared CRS is assumed to share the other layer's,
/// so nothing is reprojected in that case. Returns whether the points
/// were reprojected.
///
/// # Errors
///
/// Returns [`DensityError::Reproject`] if no transform exists between the
/// two systems or a point cannot be transformed.
pub fn harmonize_points(
    points: &mut PointLayer,
    target: Option<&Crs>,
    reprojector: &dyn Reprojector,
) -> Result<bool, DensityError> {
    let (Some(source), Some(target)) = (points.crs.clone(), target) else {
        if points.crs.as_ref() != target {
            log::warn!(
                "Only one layer declares a CRS ({}); assuming both layers share it",
                points.crs.as_ref().or(target).map_or_else(String::new, ToString::to_string)
            );
        }
        return Ok(false);
    };

    if &source == target {
        log::debug!("Point layer already in {target}");
        return Ok(false);
    }

    log::info!("Reprojecting {} points from {source} to {target}", points.features.len());

    let transform = reprojector.transform(&source, target)?;
    for feature in &mut points.features {
        feature.point = transform.apply_point(feature.point)?;
    }
    points.crs = Some(target.clone());

    Ok(true)
}
