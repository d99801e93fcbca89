//! Coordinate reprojection between reference systems.
//!
//! A [`Reprojector`] hands out a [`CoordTransform`] for one
//! `(source, target)` pair, which is then applied to every coordinate of a
//! layer. The built-in implementation is pure Rust and covers the
//! pairs that show up in web-published `GeoJSON` (identity, and geographic
//! WGS 84 to and from Web Mercator). Enabling the `proj` feature adds
//! [`ProjReprojector`], backed by the PROJ library, for everything else.

use dev_density_models::Crs;
use geo::{Coord, Point};

/// Semi-major axis of the WGS 84 ellipsoid, used as the sphere radius by
/// Web Mercator.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Errors from coordinate reprojection.
#[derive(Debug, thiserror::Error)]
pub enum ReprojectError {
    /// No transform is available between the two systems.
    #[error("No transform available from {from} to {to}")]
    Unsupported {
        /// Source CRS.
        from: Crs,
        /// Target CRS.
        to: Crs,
    },

    /// The transform could not be initialized.
    #[error("Failed to initialize transform from {from} to {to}: {message}")]
    Init {
        /// Source CRS.
        from: Crs,
        /// Target CRS.
        to: Crs,
        /// Description of what went wrong.
        message: String,
    },

    /// A coordinate lies outside the domain of the transform.
    #[error("Cannot transform coordinate ({x}, {y}): {message}")]
    Transform {
        /// Input x (easting or longitude).
        x: f64,
        /// Input y (northing or latitude).
        y: f64,
        /// Description of what went wrong.
        message: String,
    },
}

/// A coordinate transform bound to one source and target CRS.
pub trait CoordTransform {
    /// Transforms a single coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ReprojectError::Transform`] if the coordinate cannot be
    /// represented in the target system.
    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, ReprojectError>;

    /// Transforms a point.
    ///
    /// # Errors
    ///
    /// See [`CoordTransform::apply`].
    fn apply_point(&self, point: Point<f64>) -> Result<Point<f64>, ReprojectError> {
        self.apply(point.0).map(Point)
    }
}

/// Source of coordinate transforms.
pub trait Reprojector {
    /// Builds a transform from `from` into `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ReprojectError`] if the pair is unsupported or the
    /// transform cannot be initialized.
    fn transform(&self, from: &Crs, to: &Crs) -> Result<Box<dyn CoordTransform>, ReprojectError>;
}

/// Pure-Rust reprojector for identity and WGS 84 / Web Mercator.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinReprojector;

/// Transforms the [`BuiltinReprojector`] knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltinTransform {
    Identity,
    GeographicToMercator,
    MercatorToGeographic,
}

impl Reprojector for BuiltinReprojector {
    fn transform(&self, from: &Crs, to: &Crs) -> Result<Box<dyn CoordTransform>, ReprojectError> {
        let transform = match (from.epsg_code(), to.epsg_code()) {
            _ if from == to => BuiltinTransform::Identity,
            (Some(Crs::WGS84_CODE), Some(Crs::WEB_MERCATOR_CODE)) => {
                BuiltinTransform::GeographicToMercator
            }
            (Some(Crs::WEB_MERCATOR_CODE), Some(Crs::WGS84_CODE)) => {
                BuiltinTransform::MercatorToGeographic
            }
            _ => {
                return Err(ReprojectError::Unsupported {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        };

        log::debug!("Using built-in {transform:?} transform from {from} to {to}");
        Ok(Box::new(transform))
    }
}

impl CoordTransform for BuiltinTransform {
    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, ReprojectError> {
        match self {
            Self::Identity => Ok(coord),
            Self::GeographicToMercator => {
                let Coord { x: lon, y: lat } = coord;
                if !lon.is_finite() || !lat.is_finite() || lat.abs() >= 90.0 {
                    return Err(ReprojectError::Transform {
                        x: lon,
                        y: lat,
                        message: "latitude must be strictly between -90 and 90".to_string(),
                    });
                }
                let x = WEB_MERCATOR_RADIUS * lon.to_radians();
                let y = WEB_MERCATOR_RADIUS
                    * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0)
                        .tan()
                        .ln();
                Ok(Coord { x, y })
            }
            Self::MercatorToGeographic => {
                let Coord { x, y } = coord;
                if !x.is_finite() || !y.is_finite() {
                    return Err(ReprojectError::Transform {
                        x,
                        y,
                        message: "coordinate is not finite".to_string(),
                    });
                }
                let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
                let lat = 2.0f64
                    .mul_add(
                        (y / WEB_MERCATOR_RADIUS).exp().atan(),
                        -std::f64::consts::FRAC_PI_2,
                    )
                    .to_degrees();
                Ok(Coord { x: lon, y: lat })
            }
        }
    }
}

/// PROJ-backed reprojector for any pair of systems PROJ knows.
#[cfg(feature = "proj")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjReprojector;

#[cfg(feature = "proj")]
struct ProjTransform {
    proj: proj::Proj,
}

#[cfg(feature = "proj")]
impl Reprojector for ProjReprojector {
    fn transform(&self, from: &Crs, to: &Crs) -> Result<Box<dyn CoordTransform>, ReprojectError> {
        if from == to {
            return Ok(Box::new(BuiltinTransform::Identity));
        }

        // new_known_crs normalizes axis order to longitude/easting first,
        // which is what GeoJSON coordinates use.
        let proj = proj::Proj::new_known_crs(&from.to_string(), &to.to_string(), None).map_err(
            |e| ReprojectError::Init {
                from: from.clone(),
                to: to.clone(),
                message: e.to_string(),
            },
        )?;

        log::debug!("Using PROJ transform from {from} to {to}");
        Ok(Box::new(ProjTransform { proj }))
    }
}

#[cfg(feature = "proj")]
impl CoordTransform for ProjTransform {
    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, ReprojectError> {
        self.proj
            .convert((coord.x, coord.y))
            .map(|(x, y)| Coord { x, y })
            .map_err(|e| ReprojectError::Transform {
                x: coord.x,
                y: coord.y,
                message: e.to_string(),
            })
    }
}

/// The most capable reprojector compiled into this build.
#[must_use]
pub fn default_reprojector() -> Box<dyn Reprojector> {
    #[cfg(feature = "proj")]
    {
        Box::new(ProjReprojector)
    }
    #[cfg(not(feature = "proj"))]
    {
        Box::new(BuiltinReprojector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn identity_leaves_coordinates_alone() {
        let transform = BuiltinReprojector
            .transform(&Crs::epsg(27700), &Crs::epsg(27700))
            .unwrap();
        let out = transform.apply(Coord { x: 530_000.0, y: 180_000.0 }).unwrap();
        assert_eq!(out, Coord { x: 530_000.0, y: 180_000.0 });
    }

    #[test]
    fn projects_geographic_to_web_mercator() {
        let transform = BuiltinReprojector
            .transform(&Crs::wgs84(), &Crs::web_mercator())
            .unwrap();

        let origin = transform.apply(Coord { x: 0.0, y: 0.0 }).unwrap();
        assert!(close(origin.x, 0.0, 1e-6));
        assert!(close(origin.y, 0.0, 1e-6));

        // Antimeridian maps to half the equatorial circumference.
        let east = transform.apply(Coord { x: 180.0, y: 0.0 }).unwrap();
        assert!(close(east.x, 20_037_508.342_789_244, 1e-3));

        let london = transform.apply(Coord { x: -0.1276, y: 51.5072 }).unwrap();
        assert!(close(london.x, -14_204.367, 0.01));
        assert!(close(london.y, 6_711_506.705, 0.01));
    }

    #[test]
    fn inverse_recovers_geographic_coordinates() {
        let forward = BuiltinReprojector
            .transform(&Crs::wgs84(), &Crs::web_mercator())
            .unwrap();
        let inverse = BuiltinReprojector
            .transform(&Crs::web_mercator(), &Crs::wgs84())
            .unwrap();

        let start = Point::new(174.7633, -36.8485);
        let back = inverse
            .apply_point(forward.apply_point(start).unwrap())
            .unwrap();

        assert!(close(back.x(), start.x(), 1e-9));
        assert!(close(back.y(), start.y(), 1e-9));
    }

    #[test]
    fn rejects_poles() {
        let transform = BuiltinReprojector
            .transform(&Crs::wgs84(), &Crs::web_mercator())
            .unwrap();
        assert!(matches!(
            transform.apply(Coord { x: 0.0, y: 90.0 }),
            Err(ReprojectError::Transform { .. })
        ));
    }

    #[test]
    fn unsupported_pair_is_an_error() {
        let result = BuiltinReprojector.transform(&Crs::epsg(27700), &Crs::wgs84());
        assert!(matches!(result, Err(ReprojectError::Unsupported { .. })));
    }
}
