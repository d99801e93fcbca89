#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Development density (units per hectare) for parcel polygons.
//!
//! Loads a parcel polygon layer and a development point layer from
//! `GeoJSON`, brings the points into the parcels' CRS, computes each
//! parcel's area in hectares, attributes every point to the parcel that
//! strictly contains it, and writes the parcels back out with `area_ha`,
//! `Units` and `UnitsHA` attached. See [`pipeline::run`] for the whole
//! flow.

pub mod aggregate;
pub mod area;
pub mod config;
pub mod harmonize;
pub mod layer;
pub mod merge;
pub mod pipeline;
pub mod progress;

use std::path::PathBuf;

use dev_density_models::CrsParseError;
use dev_density_spatial::ReprojectError;

/// Errors that can occur while computing parcel density.
#[derive(Debug, thiserror::Error)]
pub enum DensityError {
    /// A file could not be opened or read.
    #[error("Failed to read {path:?}: {source}")]
    Read {
        /// The file being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file could not be created or written.
    #[error("Failed to write {path:?}: {source}")]
    Write {
        /// The file being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A file was not valid `GeoJSON`.
    #[error("Failed to parse GeoJSON {path:?}: {source}")]
    GeoJson {
        /// The file being parsed.
        path: PathBuf,
        /// Underlying parse error.
        source: Box<geojson::Error>,
    },

    /// A `GeoJSON` file held something other than a `FeatureCollection`.
    #[error("GeoJSON {path:?} must be a FeatureCollection")]
    NotFeatureCollection {
        /// The offending file.
        path: PathBuf,
    },

    /// The layer's `crs` member could not be understood.
    #[error("Invalid CRS declaration: {0}")]
    Crs(#[from] CrsParseError),

    /// A point's unit count was not numeric.
    #[error("Point feature {index} has a non-numeric `{field}` value: {value}")]
    InvalidUnits {
        /// Positional index of the point feature.
        index: usize,
        /// Name of the units attribute.
        field: String,
        /// The value as found, rendered as JSON.
        value: String,
    },

    /// Reprojecting the point layer failed.
    #[error("Reprojection error: {0}")]
    Reproject(#[from] ReprojectError),

    /// The configuration file was not valid TOML.
    #[error("Failed to parse config {path:?}: {source}")]
    Config {
        /// The configuration file.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },
}
