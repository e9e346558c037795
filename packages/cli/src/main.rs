#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI for running the hotspot and trend analyses on a local CSV.
//!
//! ```text
//! crime_hotspots_cli hotspots data/crimes.csv [--pretty]
//! crime_hotspots_cli trend data/crimes.csv [--forecast-years 5]
//! ```
//!
//! Prints the same JSON the API server would return. A handled failure
//! prints `{"error": "..."}` and exits with status 1.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use crime_hotspots_analysis::{AnalysisConfig, AnalysisError, crime_trend, hotspots};
use crime_hotspots_analysis_models::ApiResponse;
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "crime_hotspots_cli",
    about = "Cluster crime hotspots and forecast yearly totals from a CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Seed for k-means initialization
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of k-means restarts
    #[arg(long, global = true)]
    restarts: Option<usize>,

    /// Number of years to forecast
    #[arg(long, global = true)]
    forecast_years: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster regions into Low/Medium/High risk tiers
    Hotspots {
        /// Path to the CSV file
        file: PathBuf,
    },
    /// Fit a linear trend over yearly totals and forecast ahead
    Trend {
        /// Path to the CSV file
        file: PathBuf,
    },
}

impl Cli {
    fn analysis_config(&self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        AnalysisConfig {
            seed: self.seed.unwrap_or(defaults.seed),
            restarts: self.restarts.unwrap_or(defaults.restarts),
            forecast_years: self.forecast_years.unwrap_or(defaults.forecast_years),
            ..defaults
        }
    }
}

type Operation<T> = fn(&str, &[u8], &AnalysisConfig) -> Result<T, AnalysisError>;

/// Reads `file` and runs `operation` on it. Unreadable files become an
/// error response like any other failure.
fn run<T: Serialize>(
    file: &Path,
    config: &AnalysisConfig,
    operation: Operation<T>,
) -> ApiResponse<T> {
    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("Failed to read {}: {e}", file.display());
            return ApiResponse::error(format!("Failed to read {}: {e}", file.display()));
        }
    };
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    log::info!("Analysing {} ({} bytes)", file.display(), bytes.len());
    ApiResponse::from_result(operation(&file_name, &bytes, config))
}

fn print<T: Serialize>(response: &ApiResponse<T>, pretty: bool) -> Result<(), serde_json::Error> {
    let json = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serde_json::to_string(response)?
    };
    println!("{json}");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let config = cli.analysis_config();

    let failed = match &cli.command {
        Commands::Hotspots { file } => {
            let response = run(file, &config, hotspots);
            print(&response, cli.pretty)?;
            response.is_error()
        }
        Commands::Trend { file } => {
            let response = run(file, &config, crime_trend);
            print(&response, cli.pretty)?;
            response.is_error()
        }
    };

    if failed {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use serde_json::{Value, json};
    use tempfile::NamedTempFile;

    use super::*;

    const REGIONS_CSV: &str = "\
State,Latitude,Longitude,Rate,Crime Type,2020,2021,2022
Alpha,10,70,1.5,theft,10,20,30
Beta,11,71,2.5,assault,15,25,35
Gamma,12,72,3.5,murder,500,600,700
Delta,13,73,4.5,fraud,200,210,220
";

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn to_json<T: Serialize>(response: &ApiResponse<T>) -> Value {
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn runs_trend_over_a_csv_file() {
        let file = temp_file(".csv", REGIONS_CSV);
        let response = run(file.path(), &AnalysisConfig::default(), crime_trend);

        assert!(!response.is_error());
        let body = to_json(&response);
        assert_eq!(
            body[0],
            json!({ "year": 2020, "total_crimes": 725, "predicted_total_crimes": null })
        );
        assert_eq!(body.as_array().unwrap().len(), 6);
    }

    #[test]
    fn runs_hotspots_over_a_csv_file() {
        let file = temp_file(".csv", REGIONS_CSV);
        let response = run(file.path(), &AnalysisConfig::default(), hotspots);

        let body = to_json(&response);
        assert_eq!(body[2]["state"], "Gamma");
        assert_eq!(body[2]["risk"], "High");
    }

    #[test]
    fn rejects_non_csv_file_name() {
        let file = temp_file(".txt", REGIONS_CSV);
        let response = run(file.path(), &AnalysisConfig::default(), hotspots);

        assert!(response.is_error());
        assert_eq!(to_json(&response), json!({ "error": "Please upload a valid CSV file" }));
    }

    #[test]
    fn unreadable_file_is_an_error_body() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        let response = run(&missing, &AnalysisConfig::default(), crime_trend);

        assert!(response.is_error());
        let body = to_json(&response);
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(
            object["error"].as_str().is_some_and(|e| e.contains("missing.csv")),
            "body {body}"
        );
    }

    #[test]
    fn flags_override_analysis_defaults() {
        let cli = Cli::try_parse_from([
            "crime_hotspots_cli",
            "trend",
            "data.csv",
            "--seed",
            "7",
            "--forecast-years",
            "5",
        ])
        .unwrap();
        let config = cli.analysis_config();

        assert_eq!(config.seed, 7);
        assert_eq!(config.forecast_years, 5);
        assert_eq!(config.restarts, AnalysisConfig::default().restarts);
    }
}
