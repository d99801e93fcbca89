//! Spatial join of points to parcels and per-parcel aggregation.

use std::collections::BTreeMap;

use dev_density_spatial::ContainmentIndex;

use crate::layer::PointFeature;
use crate::progress::ProgressCallback;

/// Units attributed to one parcel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParcelAggregate {
    /// Sum of `Units` over the contained points.
    pub units: f64,
    /// Number of contained points.
    pub point_count: usize,
    /// The parcel's area in hectares.
    pub area_ha: f64,
}

impl ParcelAggregate {
    /// Units per hectare for this parcel, or `None` when the parcel has
    /// no positive area.
    #[must_use]
    pub fn units_ha(&self) -> Option<f64> {
        units_per_hectare(self.units, self.area_ha)
    }
}

/// Result of joining a point layer against a parcel layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    /// Aggregates keyed by parcel index. Parcels without points are absent.
    pub aggregates: BTreeMap<usize, ParcelAggregate>,
    /// Points attributed to a parcel.
    pub matched_points: usize,
    /// Points outside every parcel interior.
    pub unmatched_points: usize,
}

/// Density for `units` spread over `area_ha` hectares.
///
/// Undefined (`None`) for a non-positive or non-finite area.
#[must_use]
pub fn units_per_hectare(units: f64, area_ha: f64) -> Option<f64> {
    (area_ha > 0.0 && area_ha.is_finite()).then(|| units / area_ha)
}

/// Attributes every point to the parcel that strictly contains it and
/// sums units per parcel.
///
/// `areas` is indexed like the parcel layer the index was built from.
/// Points on a boundary or outside every parcel are counted as unmatched
/// and contribute nothing.
#[must_use]
pub fn aggregate_units(
    index: &ContainmentIndex,
    points: &[PointFeature],
    areas: &[f64],
    progress: &dyn ProgressCallback,
) -> JoinOutcome {
    let mut outcome = JoinOutcome::default();

    if points.is_empty() {
        progress.finish_and_clear();
        return outcome;
    }

    progress.set_message("Joining points to parcels".to_string());
    progress.set_total(points.len() as u64);

    for point in points {
        progress.inc(1);

        let Some(parcel) = index.locate(point.point) else {
            log::trace!("Point {} is not inside any parcel", point.index);
            outcome.unmatched_points += 1;
            continue;
        };

        let area_ha = areas.get(parcel).copied().unwrap_or_default();
        let entry = outcome
            .aggregates
            .entry(parcel)
            .or_insert_with(|| ParcelAggregate {
                units: 0.0,
                point_count: 0,
                area_ha,
            });
        entry.units += point.units;
        entry.point_count += 1;
        outcome.matched_points += 1;
    }

    progress.finish(format!(
        "Joined {} points to {} parcels",
        outcome.matched_points,
        outcome.aggregates.len()
    ));

    log::info!(
        "Spatial join matched {} points to {} parcels ({} points outside every parcel)",
        outcome.matched_points,
        outcome.aggregates.len(),
        outcome.unmatched_points
    );

    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use geo::{LineString, MultiPolygon, Point, Polygon};

    use super::*;
    use crate::progress::NullProgress;

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

    fn point(index: usize, x: f64, y: f64, units: f64) -> PointFeature {
        PointFeature {
            index,
            point: Point::new(x, y),
            units,
        }
    }

    #[test]
    fn sums_units_per_parcel() {
        let parcels = [square(0.0, 0.0, 100.0), square(200.0, 0.0, 100.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());
        let points = [
            point(0, 10.0, 10.0, 3.0),
            point(1, 90.0, 90.0, 4.0),
            point(2, 250.0, 50.0, 2.0),
        ];

        let outcome = aggregate_units(&index, &points, &[1.0, 1.0], &NullProgress);

        assert_eq!(outcome.matched_points, 3);
        assert_eq!(outcome.unmatched_points, 0);
        let first = outcome.aggregates[&0];
        assert!((first.units - 7.0).abs() < f64::EPSILON);
        assert_eq!(first.point_count, 2);
        assert_eq!(first.units_ha(), Some(7.0));
        assert!((outcome.aggregates[&1].units - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn drops_points_outside_and_on_boundaries() {
        let parcels = [square(0.0, 0.0, 100.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());
        let points = [
            point(0, 500.0, 500.0, 5.0),
            point(1, 100.0, 50.0, 6.0),
            point(2, 50.0, 50.0, 1.0),
        ];

        let outcome = aggregate_units(&index, &points, &[1.0], &NullProgress);

        assert_eq!(outcome.matched_points, 1);
        assert_eq!(outcome.unmatched_points, 2);
        assert!((outcome.aggregates[&0].units - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_points_means_no_aggregates() {
        let parcels = [square(0.0, 0.0, 100.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());

        let outcome = aggregate_units(&index, &[], &[1.0], &NullProgress);

        assert!(outcome.aggregates.is_empty());
        assert_eq!(outcome.matched_points, 0);
    }

    #[derive(Default)]
    struct CountingProgress {
        total: AtomicU64,
        advanced: AtomicU64,
        finished: AtomicBool,
        cleared: AtomicBool,
    }

    impl ProgressCallback for CountingProgress {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }
        fn inc(&self, delta: u64) {
            self.advanced.fetch_add(delta, Ordering::SeqCst);
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, _msg: String) {
            self.finished.store(true, Ordering::SeqCst);
        }
        fn finish_and_clear(&self) {
            self.cleared.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn reports_one_step_per_point() {
        let parcels = [square(0.0, 0.0, 100.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());
        let points = [point(0, 10.0, 10.0, 1.0), point(1, 500.0, 500.0, 1.0)];
        let progress = CountingProgress::default();

        aggregate_units(&index, &points, &[1.0], &progress);

        assert_eq!(progress.total.load(Ordering::SeqCst), 2);
        assert_eq!(progress.advanced.load(Ordering::SeqCst), 2);
        assert!(progress.finished.load(Ordering::SeqCst));
        assert!(!progress.cleared.load(Ordering::SeqCst));
    }

    #[test]
    fn clears_progress_when_there_are_no_points() {
        let parcels = [square(0.0, 0.0, 100.0)];
        let index = ContainmentIndex::build(parcels.iter().enumerate());
        let progress = CountingProgress::default();

        aggregate_units(&index, &[], &[1.0], &progress);

        assert!(progress.cleared.load(Ordering::SeqCst));
        assert_eq!(progress.advanced.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn density_is_undefined_without_area() {
        assert_eq!(units_per_hectare(7.0, 2.0), Some(3.5));
        assert_eq!(units_per_hectare(7.0, 0.0), None);
        assert_eq!(units_per_hectare(0.0, 0.0), None);
        assert_eq!(units_per_hectare(1.0, f64::NAN), None);
    }
}
