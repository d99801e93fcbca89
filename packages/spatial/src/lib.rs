#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for parcel attribution.
//!
//! Builds an R-tree over parcel polygon envelopes and answers "which
//! parcel strictly contains this point" lookups. Also provides the
//! [`Reprojector`] capability used to bring a point layer into the
//! parcel layer's coordinate reference system before any lookup runs.

pub mod reproject;

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};

#[cfg(feature = "proj")]
pub use reproject::ProjReprojector;
pub use reproject::{
    BuiltinReprojector, CoordTransform, ReprojectError, Reprojector, default_reprojector,
};

/// A parcel polygon stored in the R-tree with its identity.
struct ParcelEntry {
    /// Positional index of the parcel in its collection.
    index: usize,
    /// Planar area, used to pick the innermost of overlapping parcels.
    area: f64,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for ParcelEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built containment index over a parcel layer.
///
/// Constructed once per run. Lookups test strict interior containment,
/// so a point lying exactly on a parcel boundary belongs to no parcel.
pub struct ContainmentIndex {
    parcels: RTree<ParcelEntry>,
}

impl ContainmentIndex {
    /// Bulk-loads the index from `(index, polygon)` pairs.
    ///
    /// Empty polygons have no envelope and can contain nothing, so they
    /// are left out of the tree.
    #[must_use]
    pub fn build<'a>(polygons: impl IntoIterator<Item = (usize, &'a MultiPolygon<f64>)>) -> Self {
        use geo::Area;

        let mut entries = Vec::new();

        for (index, polygon) in polygons {
            let Some(envelope) = compute_envelope(polygon) else {
                log::debug!("Parcel {index} has an empty geometry; not indexed");
                continue;
            };

            entries.push(ParcelEntry {
                index,
                area: polygon.unsigned_area(),
                envelope,
                polygon: polygon.clone(),
            });
        }

        let parcels = RTree::bulk_load(entries);
        log::info!("Loaded {} parcels into containment index", parcels.size());

        Self { parcels }
    }

    /// Number of indexed parcels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parcels.size()
    }

    /// Whether the index holds no parcels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parcels.size() == 0
    }

    /// Look up the parcel whose interior contains `point`.
    ///
    /// Parcels can overlap; the smallest area wins and equal areas fall
    /// back to the lowest positional index, so every point maps to at
    /// most one parcel and the answer does not depend on tree order.
    #[must_use]
    pub fn locate(&self, point: Point<f64>) -> Option<usize> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        let mut best: Option<&ParcelEntry> = None;

        for entry in self.parcels.locate_in_envelope_intersecting(&query_env) {
            if entry.polygon.contains(&point) {
                match best {
                    None => best = Some(entry),
                    Some(current)
                        if entry
                            .area
                            .total_cmp(&current.area)
                            .then(entry.index.cmp(&current.index))
                            .is_lt() =>
                    {
                        best = Some(entry);
                    }
                    _ => {}
                }
            }
        }

        best.map(|e| e.index)
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> Option<AABB<[f64; 2]>> {
    mp.bounding_rect()
        .map(|rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
}

#[cfg(test)]
mod tests {
    use geo::{LineString, Polygon};

    use super::*;

    fn square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (min_x, min_y),
                (min_x + size, min_y),
                (min_x + size, min_y + size),
                (min_x, min_y + size),
                (min_x, min_y),
            ]),
            vec![],
        )])
    }

    #[test]
    fn locates_point_in_interior() {
        let parcels = [square(0.0, 0.0, 100.0), square(200.0, 0.0, 100.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());

        assert_eq!(index.len(), 2);
        assert_eq!(index.locate(Point::new(50.0, 50.0)), Some(0));
        assert_eq!(index.locate(Point::new(250.0, 10.0)), Some(1));
    }

    #[test]
    fn point_outside_every_parcel_is_unmatched() {
        let parcels = [square(0.0, 0.0, 100.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());

        assert_eq!(index.locate(Point::new(150.0, 50.0)), None);
    }

    #[test]
    fn point_on_boundary_is_excluded() {
        let parcels = [square(0.0, 0.0, 100.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());

        assert_eq!(index.locate(Point::new(100.0, 50.0)), None);
        assert_eq!(index.locate(Point::new(0.0, 0.0)), None);
    }

    #[test]
    fn point_on_shared_edge_belongs_to_neither_parcel() {
        let parcels = [square(0.0, 0.0, 100.0), square(100.0, 0.0, 100.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());

        assert_eq!(index.locate(Point::new(100.0, 40.0)), None);
    }

    #[test]
    fn point_in_hole_is_excluded() {
        let with_hole = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (100.0, 0.0),
                (100.0, 100.0),
                (0.0, 100.0),
                (0.0, 0.0),
            ]),
            vec![LineString::from(vec![
                (40.0, 40.0),
                (60.0, 40.0),
                (60.0, 60.0),
                (40.0, 60.0),
                (40.0, 40.0),
            ])],
        )]);
        let parcels = [with_hole];
        let index = ContainmentIndex::build(parcels.iter().enumerate());

        assert_eq!(index.locate(Point::new(50.0, 50.0)), None);
        assert_eq!(index.locate(Point::new(10.0, 10.0)), Some(0));
    }

    #[test]
    fn overlapping_parcels_prefer_smallest() {
        let parcels = [square(0.0, 0.0, 100.0), square(10.0, 10.0, 20.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());

        assert_eq!(index.locate(Point::new(15.0, 15.0)), Some(1));
        assert_eq!(index.locate(Point::new(80.0, 80.0)), Some(0));
    }

    #[test]
    fn identical_parcels_prefer_lowest_index() {
        let parcels = [square(0.0, 0.0, 10.0), square(0.0, 0.0, 10.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());

        assert_eq!(index.locate(Point::new(5.0, 5.0)), Some(0));
    }

    #[test]
    fn empty_polygons_are_not_indexed() {
        let parcels = [MultiPolygon::<f64>(vec![]), square(0.0, 0.0, 10.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());

        assert_eq!(index.len(), 1);
        assert_eq!(index.locate(Point::new(5.0, 5.0)), Some(1));
    }

    #[test]
    fn empty_index_locates_nothing() {
        let index = ContainmentIndex::build(std::iter::empty::<(usize, &MultiPolygon<f64>)>());
        assert!(index.is_empty());
        assert_eq!(index.locate(Point::new(0.0, 0.0)), None);
    }
}
