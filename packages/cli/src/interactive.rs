//! Interactive menu shown when the CLI runs without a subcommand.

use std::path::PathBuf;

use civic_pulse_report_models::NewReport;
use civic_pulse_zones_models::{DUPLICATE_THRESHOLD_DEGREES, Precision, ScoringProfile, ZoneConfig};
use dialoguer::{Input, Select};

/// Top-level tool selection.
enum Tool {
    Zones,
    CheckDuplicate,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[Self::Zones, Self::CheckDuplicate, Self::Server];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Zones => "Show ranked zones",
            Self::CheckDuplicate => "Check for a duplicate report",
            Self::Server => "Start server",
        }
    }
}

fn prompt_snapshot() -> Result<PathBuf, dialoguer::Error> {
    let path: String = Input::new()
        .with_prompt("Report snapshot (JSON)")
        .default("reports.json".to_string())
        .interact_text()?;
    Ok(PathBuf::from(path))
}

fn prompt_zone_config() -> Result<ZoneConfig, dialoguer::Error> {
    let digits: u8 = Input::new()
        .with_prompt(format!("Zone precision (0-{})", Precision::MAX))
        .default(Precision::DEFAULT.digits())
        .validate_with(|digits: &u8| Precision::new(*digits).map(|_| ()))
        .interact_text()?;

    let profiles = ScoringProfile::all();
    let labels: Vec<String> = profiles.iter().map(ToString::to_string).collect();
    let idx = Select::new()
        .with_prompt("Scoring profile")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(ZoneConfig {
        precision: Precision::new(digits).unwrap_or_default(),
        scoring: profiles[idx],
    })
}

fn prompt_candidate() -> Result<NewReport, Box<dyn std::error::Error>> {
    let latitude: String = Input::new().with_prompt("Latitude").interact_text()?;
    let longitude: String = Input::new().with_prompt("Longitude").interact_text()?;
    let category: String = Input::new()
        .with_prompt("Category")
        .default("General".to_string())
        .interact_text()?;

    Ok(crate::duplicate_candidate(&latitude, &longitude, &category)?)
}

/// Shows the tool menu and runs the selected tool.
///
/// # Errors
///
/// Returns an error if a prompt fails, the snapshot cannot be read, or the
/// server fails to start.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("CivicPulse Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Zones => {
            let input = prompt_snapshot()?;
            let config = prompt_zone_config()?;
            crate::print_zones(&input, config, false)?;
        }
        Tool::CheckDuplicate => {
            let input = prompt_snapshot()?;
            let candidate = prompt_candidate()?;
            crate::print_duplicate(&input, &candidate, DUPLICATE_THRESHOLD_DEGREES)?;
        }
        Tool::Server => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(civic_pulse_server::interactive::run())
            })
            .await??;
        }
    }

    Ok(())
}
