#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tools for CivicPulse.
//!
//! Computes ranked zones and near-duplicate checks against a JSON report
//! snapshot (the same format the server persists to), or starts the API
//! server. Running without a subcommand opens an interactive menu.

mod interactive;
mod report;

use std::path::{Path, PathBuf};

use civic_pulse_report_models::{NewReport, ReportSubmission, ValidationError};
use civic_pulse_server::{ServerConfig, run_server};
use civic_pulse_zones::{find_duplicate, ranked_zones};
use civic_pulse_zones_models::{
    DUPLICATE_THRESHOLD_DEGREES, Precision, ScoringProfile, ZoneConfig,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "civic_pulse_cli", about = "CivicPulse zone clustering tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print zones ranked by confidence for a report snapshot
    Zones {
        /// Path to a JSON array of reports
        #[arg(long)]
        input: PathBuf,
        /// Decimal places kept when bucketing coordinates (0-8)
        #[arg(long, default_value_t = Precision::DEFAULT, value_parser = parse_precision)]
        precision: Precision,
        /// Confidence scoring profile (`standard` or `vote_weighted`)
        #[arg(long, default_value = "standard")]
        scoring: ScoringProfile,
        /// Emit JSON instead of a text table
        #[arg(long)]
        json: bool,
    },
    /// Check whether a report would duplicate one already in a snapshot
    CheckDuplicate {
        /// Path to a JSON array of reports
        #[arg(long)]
        input: PathBuf,
        /// Candidate latitude
        #[arg(long, allow_negative_numbers = true)]
        lat: String,
        /// Candidate longitude
        #[arg(long, allow_negative_numbers = true)]
        lng: String,
        /// Candidate category (case-sensitive)
        #[arg(long)]
        category: String,
        /// Maximum planar distance in degrees
        #[arg(long, default_value_t = DUPLICATE_THRESHOLD_DEGREES)]
        threshold: f64,
    },
    /// Start the API server using environment configuration
    Serve,
}

fn parse_precision(value: &str) -> Result<Precision, String> {
    let digits: u8 = value.parse().map_err(|e: std::num::ParseIntError| e.to_string())?;
    Precision::new(digits).map_err(|e| e.to_string())
}

/// Validates a duplicate-check candidate the same way submitted reports
/// are validated. Severity plays no part in duplicate detection.
fn duplicate_candidate(lat: &str, lng: &str, category: &str) -> Result<NewReport, ValidationError> {
    ReportSubmission {
        title: Some("candidate".to_string()),
        category: Some(category.to_string()),
        lat: Some(serde_json::Value::String(lat.to_string())),
        lng: Some(serde_json::Value::String(lng.to_string())),
        severity: Some(serde_json::Value::from(0)),
    }
    .validate()
}

/// Prints ranked zones for the snapshot at `input`.
fn print_zones(
    input: &Path,
    config: ZoneConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let reports = civic_pulse_store::load(input)?;
    log::debug!(
        "Loaded {} reports from {}",
        reports.len(),
        input.display()
    );
    let zones = ranked_zones(&reports, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&zones)?);
    } else {
        print!("{}", report::render_table(&zones));
    }
    Ok(())
}

/// Prints the first report in the snapshot at `input` that `candidate`
/// duplicates.
fn print_duplicate(
    input: &Path,
    candidate: &NewReport,
    threshold: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let reports = civic_pulse_store::load(input)?;

    match find_duplicate(candidate, &reports, threshold) {
        Some(existing) => println!(
            "Duplicate of report {} ({}, {} votes)",
            existing.id, existing.title, existing.votes
        ),
        None => println!("No duplicate"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run().await;
    };

    match command {
        Commands::Zones {
            input,
            precision,
            scoring,
            json,
        } => {
            let config = ZoneConfig { precision, scoring };
            print_zones(&input, config, json)?;
        }
        Commands::CheckDuplicate {
            input,
            lat,
            lng,
            category,
            threshold,
        } => {
            let candidate = duplicate_candidate(&lat, &lng, &category)?;
            print_duplicate(&input, &candidate, threshold)?;
        }
        Commands::Serve => {
            let config = ServerConfig::from_env()?;
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(run_server(config))
            })
            .await??;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_zone_options() {
        let cli = Cli::try_parse_from([
            "civic_pulse_cli",
            "zones",
            "--input",
            "reports.json",
            "--precision",
            "3",
            "--scoring",
            "vote_weighted",
        ])
        .unwrap();

        let Some(Commands::Zones {
            precision, scoring, ..
        }) = cli.command
        else {
            panic!("expected zones command");
        };
        assert_eq!(precision.digits(), 3);
        assert_eq!(scoring, ScoringProfile::VoteWeighted);
    }

    #[test]
    fn rejects_out_of_range_precision() {
        assert!(
            Cli::try_parse_from(["civic_pulse_cli", "zones", "--input", "r.json", "--precision", "9"])
                .is_err()
        );
    }

    #[test]
    fn accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "civic_pulse_cli",
            "check-duplicate",
            "--input",
            "r.json",
            "--lat",
            "-33.9",
            "--lng",
            "18.4",
            "--category",
            "Pothole",
        ])
        .unwrap();

        let Some(Commands::CheckDuplicate {
            lat,
            lng,
            category,
            threshold,
            ..
        }) = cli.command
        else {
            panic!("expected check-duplicate command");
        };
        assert!((threshold - DUPLICATE_THRESHOLD_DEGREES).abs() < f64::EPSILON);

        let candidate = duplicate_candidate(&lat, &lng, &category).unwrap();
        assert!((candidate.latitude - -33.9).abs() < f64::EPSILON);
        assert!((candidate.longitude - 18.4).abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_candidate_rejects_non_finite_coordinates() {
        assert_eq!(
            duplicate_candidate("NaN", "18.4", "Pothole").unwrap_err(),
            ValidationError::NotFinite { field: "lat" }
        );
        assert_eq!(
            duplicate_candidate("-33.9", "inf", "Pothole").unwrap_err(),
            ValidationError::NotFinite { field: "lng" }
        );
    }

    #[test]
    fn duplicate_candidate_rejects_blank_category() {
        assert_eq!(
            duplicate_candidate("-33.9", "18.4", "  ").unwrap_err(),
            ValidationError::MissingField { field: "category" }
        );
    }

    #[test]
    fn duplicate_candidate_rejects_out_of_range_and_junk() {
        assert!(matches!(
            duplicate_candidate("95", "18.4", "Pothole"),
            Err(ValidationError::OutOfRange { field: "lat", .. })
        ));
        assert!(matches!(
            duplicate_candidate("north", "18.4", "Pothole"),
            Err(ValidationError::NotNumeric { field: "lat", .. })
        ));
    }
}
