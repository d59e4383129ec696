//! Interactive mode for the server.
//!
//! Prompts for bind address, port, zone precision, and scoring profile
//! before starting the server.

use dialoguer::{Confirm, Input, Select};

use civic_pulse_zones_models::{Precision, ScoringProfile};

use crate::{ServerConfig, run_server};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Starts from [`ServerConfig::from_env`] (or defaults, if the environment
/// is invalid) and lets the user override each setting.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("CivicPulse Server");
    println!();

    let mut config = ServerConfig::from_env().unwrap_or_else(|e| {
        log::warn!("Ignoring invalid environment configuration: {e}");
        ServerConfig::default()
    });

    config.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(config.bind_addr.clone())
        .interact_text()
        .unwrap_or(config.bind_addr);

    config.port = Input::new()
        .with_prompt("Port")
        .default(config.port)
        .interact_text()
        .unwrap_or(config.port);

    let digits: u8 = Input::new()
        .with_prompt(format!("Zone precision (0-{})", Precision::MAX))
        .default(config.zones.precision.digits())
        .validate_with(|digits: &u8| Precision::new(*digits).map(|_| ()))
        .interact_text()
        .unwrap_or_else(|_| config.zones.precision.digits());
    config.zones.precision = Precision::new(digits).unwrap_or_default();

    let profiles = ScoringProfile::all();
    let labels: Vec<String> = profiles.iter().map(ToString::to_string).collect();
    let current = profiles
        .iter()
        .position(|p| *p == config.zones.scoring)
        .unwrap_or(0);
    let idx = Select::new()
        .with_prompt("Scoring profile")
        .items(&labels)
        .default(current)
        .interact()
        .unwrap_or(current);
    config.zones.scoring = profiles[idx];

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{}?",
            config.bind_addr, config.port
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    run_server(config).await
}
