//! Loading parcel and point layers from `GeoJSON` feature collections.
//!
//! Both layers keep their declared CRS (from the legacy `crs` member) so
//! the harmonizer can compare them. The parcel layer also keeps every
//! original feature untouched, because the output is the same collection
//! with three attributes added.

use std::path::Path;

use dev_density_models::{Crs, CrsParseError};
use geo::{MultiPolygon, Point};
use geojson::{Bbox, Feature, FeatureCollection, GeoJson, JsonObject};

use crate::DensityError;

/// A parcel polygon together with the feature it was read from.
#[derive(Debug, Clone)]
pub struct PolygonFeature {
    /// The feature exactly as read.
    pub feature: Feature,
    /// Polygonal geometry, or `None` when the feature has a null or
    /// non-polygonal geometry.
    pub geometry: Option<MultiPolygon<f64>>,
}

/// The parcel polygon layer. Feature identity is the position in
/// [`PolygonLayer::features`].
#[derive(Debug, Clone)]
pub struct PolygonLayer {
    /// Declared CRS, if any.
    pub crs: Option<Crs>,
    /// Parcels in input order.
    pub features: Vec<PolygonFeature>,
    /// Collection-level bounding box, carried through to the output.
    pub bbox: Option<Bbox>,
    /// Collection-level foreign members (including `crs`), carried
    /// through to the output.
    pub foreign_members: Option<JsonObject>,
}

/// A development point with its unit count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointFeature {
    /// Positional index in the input collection.
    pub index: usize,
    /// Point location in the layer's CRS.
    pub point: Point<f64>,
    /// Dwelling units at this point.
    pub units: f64,
}

/// The development point layer.
#[derive(Debug, Clone)]
pub struct PointLayer {
    /// Declared CRS, if any.
    pub crs: Option<Crs>,
    /// Points with a usable geometry, in input order.
    pub features: Vec<PointFeature>,
    /// Total number of features in the input collection.
    pub total: usize,
}

impl PointLayer {
    /// Number of input features dropped for lacking a point geometry.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.total - self.features.len()
    }

    /// Sum of `Units` over every usable point.
    #[must_use]
    pub fn total_units(&self) -> f64 {
        self.features.iter().map(|p| p.units).sum()
    }
}

/// Reads a `GeoJSON` file that must contain a `FeatureCollection`.
///
/// # Errors
///
/// Returns [`DensityError`] if the file cannot be read, is not valid
/// `GeoJSON`, or is some other kind of `GeoJSON` object.
pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection, DensityError> {
    let content = std::fs::read_to_string(path).map_err(|source| DensityError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let geojson = content
        .parse::<GeoJson>()
        .map_err(|source| DensityError::GeoJson {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(DensityError::NotFeatureCollection {
            path: path.to_path_buf(),
        }),
    }
}

/// Loads the parcel polygon layer from `path`.
///
/// # Errors
///
/// Returns [`DensityError`] if reading or parsing fails.
pub fn load_polygon_layer(path: &Path) -> Result<PolygonLayer, DensityError> {
    PolygonLayer::from_collection(read_feature_collection(path)?)
}

/// Loads the development point layer from `path`, reading unit counts
/// from `units_field`.
///
/// # Errors
///
/// Returns [`DensityError`] if reading or parsing fails or a unit count
/// is not numeric.
pub fn load_point_layer(path: &Path, units_field: &str) -> Result<PointLayer, DensityError> {
    PointLayer::from_collection(read_feature_collection(path)?, units_field)
}

impl PolygonLayer {
    /// Converts a feature collection into a parcel layer.
    ///
    /// Features without a polygonal geometry are kept so the output has
    /// the same features as the input, but they have no area and contain
    /// no points.
    ///
    /// # Errors
    ///
    /// Returns [`DensityError::Crs`] if the `crs` member is malformed.
    pub fn from_collection(collection: FeatureCollection) -> Result<Self, DensityError> {
        let crs = declared_crs(collection.foreign_members.as_ref())?;

        let features = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| {
                let geometry = feature.geometry.as_ref().and_then(|g| to_multipolygon(&g.value));
                if geometry.is_none() {
                    log::warn!("Polygon feature {index} has no polygonal geometry; area set to 0");
                }
                PolygonFeature { feature, geometry }
            })
            .collect();

        Ok(Self {
            crs,
            features,
            bbox: collection.bbox,
            foreign_members: collection.foreign_members,
        })
    }

    /// Number of parcels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the layer has no parcels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl PointLayer {
    /// Converts a feature collection into a point layer.
    ///
    /// Features with a null or non-point geometry are skipped. A missing
    /// or null unit count is read as zero.
    ///
    /// # Errors
    ///
    /// Returns [`DensityError::InvalidUnits`] if a unit count is present
    /// but not a non-negative number, or [`DensityError::Crs`] if the `crs` member is
    /// malformed.
    pub fn from_collection(
        collection: FeatureCollection,
        units_field: &str,
    ) -> Result<Self, DensityError> {
        let crs = declared_crs(collection.foreign_members.as_ref())?;
        let total = collection.features.len();

        let mut features = Vec::with_capacity(total);
        let mut missing_units = 0usize;

        for (index, feature) in collection.features.iter().enumerate() {
            let Some(point) = feature.geometry.as_ref().and_then(|g| to_point(&g.value)) else {
                log::warn!("Point feature {index} has no point geometry; skipped");
                continue;
            };

            let units = match feature.property(units_field) {
                None | Some(serde_json::Value::Null) => {
                    missing_units += 1;
                    0.0
                }
                Some(serde_json::Value::Number(n)) => n
                    .as_f64()
                    .filter(|units| units.is_finite() && *units >= 0.0)
                    .ok_or_else(|| DensityError::InvalidUnits {
                        index,
                        field: units_field.to_string(),
                        value: n.to_string(),
                    })?,
                Some(other) => {
                    return Err(DensityError::InvalidUnits {
                        index,
                        field: units_field.to_string(),
                        value: other.to_string(),
                    });
                }
            };

            features.push(PointFeature {
                index,
                point,
                units,
            });
        }

        if missing_units > 0 {
            log::warn!("{missing_units} point features have no `{units_field}` value; counted as 0");
        }

        Ok(Self {
            crs,
            features,
            total,
        })
    }
}

/// Reads the legacy `GeoJSON` `crs` member.
///
/// Named CRSs (`{"type": "name", "properties": {"name": ...}}`) and the
/// older EPSG form (`{"type": "EPSG", "properties": {"code": ...}}`) are
/// understood. Linked CRSs cannot be resolved offline and are treated as
/// undeclared.
fn declared_crs(foreign_members: Option<&JsonObject>) -> Result<Option<Crs>, CrsParseError> {
    let Some(member) = foreign_members.and_then(|m| m.get("crs")) else {
        return Ok(None);
    };
    if member.is_null() {
        return Ok(None);
    }

    let kind = member.get("type").and_then(serde_json::Value::as_str);
    let properties = member.get("properties");

    match kind {
        Some("name") => {
            let name = properties
                .and_then(|p| p.get("name"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            Crs::parse(name).map(Some)
        }
        Some("EPSG") => {
            let code = properties.and_then(|p| p.get("code"));
            let name = match code {
                Some(serde_json::Value::Number(n)) => format!("EPSG:{n}"),
                Some(serde_json::Value::String(s)) => format!("EPSG:{s}"),
                _ => String::new(),
            };
            Crs::parse(&name).map(Some)
        }
        _ => {
            log::warn!("Unsupported CRS declaration {member}; treating layer CRS as undeclared");
            Ok(None)
        }
    }
}

/// Parses a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(value: &geojson::Value) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = value.clone().try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Parses a `GeoJSON` geometry into a [`Point`].
/// A `MultiPoint` with a single member is accepted as that point.
fn to_point(value: &geojson::Value) -> Option<Point<f64>> {
    let geo_geom: geo::Geometry<f64> = value.clone().try_into().ok()?;
    match geo_geom {
        geo::Geometry::Point(p) => Some(p),
        geo::Geometry::MultiPoint(mp) if mp.0.len() == 1 => mp.0.into_iter().next(),
        _ => None,
    }
}
