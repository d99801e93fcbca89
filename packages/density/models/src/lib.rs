#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Development density domain types.
//!
//! These types describe what the density pipeline derives for each parcel
//! polygon and what it reports once a run completes. They carry no
//! geometry; the spatial side lives in `dev_density_spatial`.

pub mod crs;

use serde::{Deserialize, Serialize};

pub use crs::{Crs, CrsParseError};

/// Output attribute holding the polygon area in hectares.
pub const AREA_HA_FIELD: &str = "area_ha";

/// Attribute holding the dwelling unit count. Read from points, written
/// onto polygons.
pub const UNITS_FIELD: &str = "Units";

/// Output attribute holding the density in units per hectare.
pub const UNITS_HA_FIELD: &str = "UnitsHA";

/// The three attributes derived for a single parcel polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityAttributes {
    /// Planar area in hectares.
    pub area_ha: f64,
    /// Sum of `Units` over all points strictly inside the polygon.
    pub units: f64,
    /// Units per hectare. `None` when the polygon holds units but has no
    /// positive area, so the ratio is undefined.
    pub units_ha: Option<f64>,
}

impl DensityAttributes {
    /// Attributes for a polygon that contains no points.
    #[must_use]
    pub const fn undeveloped(area_ha: f64) -> Self {
        Self {
            area_ha,
            units: 0.0,
            units_ha: Some(0.0),
        }
    }

    /// Whether any units were attributed to the polygon.
    #[must_use]
    pub fn is_developed(&self) -> bool {
        self.units > 0.0
    }
}

/// Statistics describing a completed density run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensitySummary {
    /// Number of polygon features read (and written).
    pub polygon_count: usize,
    /// Number of point features read, including skipped ones.
    pub point_count: usize,
    /// Points without a usable point geometry.
    pub skipped_points: usize,
    /// Points attributed to a polygon.
    pub matched_points: usize,
    /// Points that fell outside every polygon (or on a boundary).
    pub unmatched_points: usize,
    /// Polygons with `Units > 0`.
    pub polygons_with_development: usize,
    /// Sum of `Units` over all polygons.
    pub total_units: f64,
    /// Mean `UnitsHA` over polygons with a defined density.
    pub mean_units_ha: f64,
    /// Largest `UnitsHA` over polygons with a defined density.
    pub max_units_ha: f64,
    /// Whether the point layer was reprojected into the polygon CRS.
    pub reprojected: bool,
    /// CRS of the polygon layer, if declared.
    pub crs: Option<Crs>,
}

impl DensitySummary {
    /// Builds the summary statistics from the per-polygon attributes.
    ///
    /// Undefined densities are left out of the mean and max, matching how
    /// missing values are skipped when averaging a column.
    #[must_use]
    pub fn from_attributes(attributes: &[DensityAttributes]) -> Self {
        let defined: Vec<f64> = attributes
            .iter()
            .filter_map(|a| a.units_ha)
            .filter(|d| d.is_finite())
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let mean_units_ha = if defined.is_empty() {
            0.0
        } else {
            defined.iter().sum::<f64>() / defined.len() as f64
        };
        let max_units_ha = defined.iter().copied().fold(0.0, f64::max);

        Self {
            polygon_count: attributes.len(),
            point_count: 0,
            skipped_points: 0,
            matched_points: 0,
            unmatched_points: 0,
            polygons_with_development: attributes.iter().filter(|a| a.is_developed()).count(),
            total_units: attributes.iter().map(|a| a.units).sum(),
            mean_units_ha,
            max_units_ha,
            reprojected: false,
            crs: None,
        }
    }
}
