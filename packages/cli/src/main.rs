#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Development density calculator.
//!
//! Joins development points to parcel polygons and writes the parcels
//! back out with `area_ha`, `Units` and `UnitsHA`. With no arguments the
//! fixed data layout (`../data/final/...`) is used.
//!
//! Failures are reported on the console and the process still exits
//! normally; nothing is written when a stage fails.

use std::path::PathBuf;

use clap::Parser;
use dev_density::DensityError;
use dev_density::config::DensityConfig;
use dev_density::pipeline;
use dev_density_cli_utils::IndicatifProgress;
use dev_density_models::DensitySummary;

#[derive(Parser)]
#[command(name = "dev_density", about = "Development density (units/ha) calculator")]
struct Cli {
    /// TOML file overriding the default paths
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Parcel polygon layer (`GeoJSON`)
    #[arg(long, value_name = "FILE")]
    polygons: Option<PathBuf>,

    /// Development point layer (`GeoJSON`)
    #[arg(long, value_name = "FILE")]
    points: Option<PathBuf>,

    /// Output path for the enriched parcel layer
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Point attribute holding the dwelling unit count
    #[arg(long, value_name = "NAME")]
    units_field: Option<String>,
}

impl Cli {
    /// Layers defaults, the optional config file and CLI flags, in that
    /// order of precedence (flags win).
    fn resolve(self) -> Result<DensityConfig, DensityError> {
        let mut config = match &self.config {
            Some(path) => DensityConfig::load_from_file(path)?,
            None => DensityConfig::default(),
        };

        if let Some(polygons) = self.polygons {
            config.polygons = polygons;
        }
        if let Some(points) = self.points {
            config.points = points;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(units_field) = self.units_field {
            config.units_field = units_field;
        }

        Ok(config)
    }
}

fn main() {
    let multi = dev_density_cli_utils::init_logger();
    let cli = Cli::parse();

    println!("Development Density Calculator");
    println!("{}", "=".repeat(40));

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            report(&e);
            return;
        }
    };

    let progress = IndicatifProgress::records_bar(&multi, "Joining points to parcels");
    let reprojector = dev_density_spatial::reproject::default_reprojector();

    match pipeline::run(&config, reprojector.as_ref(), progress.as_ref()) {
        Ok(summary) => print_summary(&summary, &config),
        Err(e) => report(&e),
    }
}

fn report(error: &DensityError) {
    log::error!("{error}");
    println!("Error: {error}");
}

fn print_summary(summary: &DensitySummary, config: &DensityConfig) {
    println!("Development polygons: {} features", summary.polygon_count);
    println!("Development points: {} features", summary.point_count);
    if summary.skipped_points > 0 {
        println!("Points without geometry: {}", summary.skipped_points);
    }
    if summary.reprojected {
        if let Some(crs) = &summary.crs {
            println!("Points reprojected to {crs}");
        }
    }
    println!(
        "Points inside a polygon: {} ({} outside)",
        summary.matched_points, summary.unmatched_points
    );
    println!("Updated development polygons: {} features", summary.polygon_count);
    println!("Polygons with development: {}", summary.polygons_with_development);
    println!("Average units/ha: {:.2}", summary.mean_units_ha);
    println!("Max units/ha: {:.2}", summary.max_units_ha);
    println!("Saved to {}", config.output.display());
    println!("Done!");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_uses_fixed_paths() {
        let cli = Cli::try_parse_from(["dev_density"]).unwrap();
        assert_eq!(cli.resolve().unwrap(), DensityConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "dev_density",
            "--points",
            "pts.json",
            "-o",
            "out.json",
            "--units-field",
            "dwellings",
        ])
        .unwrap();
        let config = cli.resolve().unwrap();

        assert_eq!(config.points, PathBuf::from("pts.json"));
        assert_eq!(config.output, PathBuf::from("out.json"));
        assert_eq!(config.units_field, "dwellings");
        assert_eq!(config.polygons, DensityConfig::default().polygons);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let cli = Cli::try_parse_from(["dev_density", "--config", "/nonexistent/density.toml"])
            .unwrap();
        assert!(matches!(cli.resolve(), Err(DensityError::Read { .. })));
    }
}
