//! Parcel area in hectares.
//!
//! Areas are planar, in the square of the layer's linear unit. The
//! conversion assumes that unit is the meter (a projected, meter-based
//! CRS); nothing here checks it.

use geo::{Area, MultiPolygon};

use crate::layer::PolygonLayer;

/// Square meters in one hectare.
pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;

/// Planar area of `geometry` in hectares.
#[must_use]
pub fn area_hectares(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.unsigned_area() / SQUARE_METERS_PER_HECTARE
}

/// Area in hectares of every parcel, indexed like the layer's features.
///
/// Parcels without a polygonal geometry get an area of zero.
#[must_use]
pub fn parcel_areas(layer: &PolygonLayer) -> Vec<f64> {
    layer
        .features
        .iter()
        .map(|f| f.geometry.as_ref().map_or(0.0, area_hectares))
        .collect()
}

#[cfg(test)]
mod tests {
    use geo::{LineString, Polygon};

    use super::*;

    fn rectangle(width: f64, height: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (width, 0.0),
                (width, height),
                (0.0, height),
                (0.0, 0.0),
            ]),
            vec![],
        )])
    }

    #[test]
    fn hundred_meter_square_is_one_hectare() {
        assert!((area_hectares(&rectangle(100.0, 100.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn area_ignores_ring_orientation() {
        let clockwise = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (0.0, 200.0),
                (50.0, 200.0),
                (50.0, 0.0),
                (0.0, 0.0),
            ]),
            vec![],
        )]);
        assert!((area_hectares(&clockwise) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn holes_are_subtracted() {
        let with_hole = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (200.0, 0.0),
                (200.0, 100.0),
                (0.0, 100.0),
                (0.0, 0.0),
            ]),
            vec![LineString::from(vec![
                (10.0, 10.0),
                (60.0, 10.0),
                (60.0, 60.0),
                (10.0, 60.0),
                (10.0, 10.0),
            ])],
        )]);
        assert!((area_hectares(&with_hole) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn degenerate_polygon_has_zero_area() {
        assert!(area_hectares(&rectangle(100.0, 0.0)).abs() < f64::EPSILON);
        assert!(area_hectares(&MultiPolygon(vec![])).abs() < f64::EPSILON);
    }
}
