//! Run configuration.
//!
//! Defaults reproduce the fixed layout of the parcel data directory. A
//! TOML file can override any of the keys, and the CLI can override the
//! file.

use std::path::{Path, PathBuf};

use dev_density_models::UNITS_FIELD;
use serde::{Deserialize, Serialize};

use crate::DensityError;

/// Default parcel polygon layer.
pub const DEFAULT_POLYGONS_PATH: &str = "../data/final/dev_par.json";

/// Default development point layer.
pub const DEFAULT_POINTS_PATH: &str = "../data/final/dev_pts.json";

/// Default output path.
pub const DEFAULT_OUTPUT_PATH: &str = "../data/final/dev_par_with_density.json";

/// Inputs and output of a density run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DensityConfig {
    /// Parcel polygon layer (`GeoJSON` `FeatureCollection`).
    pub polygons: PathBuf,
    /// Development point layer (`GeoJSON` `FeatureCollection`).
    pub points: PathBuf,
    /// Where the enriched parcel layer is written.
    pub output: PathBuf,
    /// Point attribute holding the dwelling unit count.
    pub units_field: String,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            polygons: PathBuf::from(DEFAULT_POLYGONS_PATH),
            points: PathBuf::from(DEFAULT_POINTS_PATH),
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
            units_field: UNITS_FIELD.to_string(),
        }
    }
}

impl DensityConfig {
    /// Loads a configuration file. Keys missing from the file keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DensityError`] if the file cannot be read or is not a
    /// valid configuration.
    pub fn load_from_file(path: &Path) -> Result<Self, DensityError> {
        let content = std::fs::read_to_string(path).map_err(|source| DensityError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| DensityError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
