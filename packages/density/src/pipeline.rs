//! The density pipeline: load, harmonize, measure, join, merge, write.
//!
//! Every stage depends on the previous one, so they run strictly in
//! sequence. [`compute_density`] is the in-memory part; [`run`] wraps it
//! with file I/O.

use dev_density_models::{DensityAttributes, DensitySummary};
use dev_density_spatial::{ContainmentIndex, Reprojector};
use geojson::FeatureCollection;

use crate::DensityError;
use crate::aggregate::aggregate_units;
use crate::area::parcel_areas;
use crate::config::DensityConfig;
use crate::harmonize::harmonize_points;
use crate::layer::{PointLayer, PolygonLayer, load_point_layer, load_polygon_layer};
use crate::merge::{enrich_collection, merge_density, write_collection};
use crate::progress::ProgressCallback;

/// Everything [`compute_density`] produces.
#[derive(Debug, Clone)]
pub struct DensityOutput {
    /// The enriched parcel collection, ready to write.
    pub collection: FeatureCollection,
    /// Derived attributes per parcel, indexed like the parcel layer.
    pub attributes: Vec<DensityAttributes>,
    /// Run statistics.
    pub summary: DensitySummary,
}

/// Computes density for every parcel in `polygons` from `points`.
///
/// The point layer is reprojected into the parcel CRS first if needed.
/// Neither input is modified; the result is a new collection.
///
/// # Errors
///
/// Returns [`DensityError::Reproject`] if the point layer cannot be
/// brought into the parcel CRS.
pub fn compute_density(
    polygons: &PolygonLayer,
    mut points: PointLayer,
    reprojector: &dyn Reprojector,
    progress: &dyn ProgressCallback,
) -> Result<DensityOutput, DensityError> {
    let reprojected = harmonize_points(&mut points, polygons.crs.as_ref(), reprojector)?;

    let areas = parcel_areas(polygons);

    log::info!("Performing spatial join...");
    let index = ContainmentIndex::build(
        polygons
            .features
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.geometry.as_ref().map(|g| (i, g))),
    );
    let join = aggregate_units(&index, &points.features, &areas, progress);

    log::info!("Calculating units per hectare...");
    let attributes = merge_density(&areas, &join);
    let collection = enrich_collection(polygons, &attributes);

    let summary = DensitySummary {
        point_count: points.total,
        skipped_points: points.skipped(),
        matched_points: join.matched_points,
        unmatched_points: join.unmatched_points,
        reprojected,
        crs: polygons.crs.clone(),
        ..DensitySummary::from_attributes(&attributes)
    };

    Ok(DensityOutput {
        collection,
        attributes,
        summary,
    })
}

/// Runs the whole pipeline described by `config` and writes the output.
///
/// Nothing is written unless both layers load and the computation
/// succeeds.
///
/// # Errors
///
/// Returns [`DensityError`] if either layer fails to load, the points
/// cannot be reprojected, or the output cannot be written.
pub fn run(
    config: &DensityConfig,
    reprojector: &dyn Reprojector,
    progress: &dyn ProgressCallback,
) -> Result<DensitySummary, DensityError> {
    log::info!("Loading development polygons from {}...", config.polygons.display());
    let polygons = load_polygon_layer(&config.polygons)?;

    log::info!("Loading development points from {}...", config.points.display());
    let points = load_point_layer(&config.points, &config.units_field)?;

    log::info!("Development polygons: {} features", polygons.len());
    log::info!("Development points: {} features", points.total);

    let output = compute_density(&polygons, points, reprojector, progress)?;

    log::info!("Saving to {}...", config.output.display());
    write_collection(&config.output, &output.collection)?;

    Ok(output.summary)
}
