//! Merging aggregates back onto the parcel layer and writing it out.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use dev_density_models::{AREA_HA_FIELD, DensityAttributes, UNITS_FIELD, UNITS_HA_FIELD};
use geojson::{FeatureCollection, JsonObject};

use crate::DensityError;
use crate::aggregate::JoinOutcome;
use crate::layer::PolygonLayer;

/// Derived attributes for every parcel, indexed like `areas`.
///
/// Parcels absent from the join get zero units and zero density.
/// Parcels with units but no positive area get an undefined density.
#[must_use]
pub fn merge_density(areas: &[f64], join: &JoinOutcome) -> Vec<DensityAttributes> {
    areas
        .iter()
        .enumerate()
        .map(|(index, &area_ha)| {
            join.aggregates.get(&index).map_or_else(
                || DensityAttributes::undeveloped(area_ha),
                |aggregate| {
                    let units_ha = aggregate.units_ha();
                    if units_ha.is_none() {
                        log::warn!(
                            "Parcel {index} holds {} units but has an area of {area_ha} ha; density is undefined",
                            aggregate.units
                        );
                    }
                    DensityAttributes {
                        area_ha,
                        units: aggregate.units,
                        units_ha,
                    }
                },
            )
        })
        .collect()
}

/// Builds the output collection: the input parcels with `area_ha`,
/// `Units` and `UnitsHA` added (or overwritten).
///
/// Geometry, ids, other properties and foreign members are carried over
/// unchanged. An undefined density is written as `null`.
#[must_use]
pub fn enrich_collection(layer: &PolygonLayer, attributes: &[DensityAttributes]) -> FeatureCollection {
    let features = layer
        .features
        .iter()
        .zip(attributes)
        .map(|(parcel, attrs)| {
            let mut feature = parcel.feature.clone();
            let properties = feature.properties.get_or_insert_with(JsonObject::new);
            properties.insert(AREA_HA_FIELD.to_string(), attrs.area_ha.into());
            properties.insert(UNITS_FIELD.to_string(), attrs.units.into());
            properties.insert(
                UNITS_HA_FIELD.to_string(),
                attrs
                    .units_ha
                    .map_or(serde_json::Value::Null, serde_json::Value::from),
            );
            feature
        })
        .collect();

    FeatureCollection {
        bbox: layer.bbox.clone(),
        features,
        foreign_members: layer.foreign_members.clone(),
    }
}

/// Writes `collection` to `path` as `GeoJSON`, creating missing parent
/// directories.
///
/// Written to a sibling `.tmp` file first and renamed into place, so an
/// existing output is only replaced by a complete document.
///
/// # Errors
///
/// Returns [`DensityError::Write`] if the file cannot be created, written or
/// moved into place.
pub fn write_collection(path: &Path, collection: &FeatureCollection) -> Result<(), DensityError> {
    let write_error = |source: std::io::Error| DensityError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = write_json(&tmp_path, collection)
        .and_then(|()| std::fs::rename(&tmp_path, path));
    if let Err(e) = result {
        std::fs::remove_file(&tmp_path).ok();
        return Err(write_error(e));
    }

    log::info!("Wrote {} features to {}", collection.features.len(), path.display());
    Ok(())
}

fn write_json(path: &Path, collection: &FeatureCollection) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, collection)?;
    writer.flush()
}
