use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forecast_core::{
    Acquisition, AcquisitionFailure, Config, Coordinate, FixedPosition, LocationResolver,
    OpenMeteoClient, Recovery, diagnostics,
};
use inquire::{Confirm, CustomType};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Hourly temperature forecast for your location")]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the position and diagnostics preference.
    Configure,

    /// Fetch and print the hourly forecast.
    Show {
        /// Latitude to use instead of the configured position.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude to use instead of the configured position.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Print the series as JSON.
        #[arg(long)]
        json: bool,

        /// Never ask to retry; exit with an error instead.
        #[arg(long)]
        no_prompt: bool,

        /// Force network diagnostics on or off for this run.
        #[arg(long)]
        diagnostics: Option<bool>,
    },

    /// Print the config file location.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { lat, lon, json, no_prompt, diagnostics } => {
                let mut config = Config::load()?;
                if let (Some(lat), Some(lon)) = (lat, lon) {
                    config.set_fixed_coordinate(Coordinate::new(lat, lon));
                }
                if diagnostics.is_some() {
                    config.diagnostics = diagnostics;
                }
                show(&config, json, !no_prompt).await
            }
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

fn build_acquisition(config: &Config) -> Result<Acquisition> {
    let platform = Arc::new(FixedPosition::new(config.fixed_coordinate()));
    let resolver = LocationResolver::new(platform).with_fix_timeout(config.fix_timeout());

    let client = OpenMeteoClient::new(config.api.base_url.clone(), config.fetch_options())
        .context("Failed to build HTTP client")?
        .with_diagnostics(diagnostics::sink_for(config.diagnostics_enabled()));

    Ok(Acquisition::new(resolver, Box::new(client)))
}

async fn show(config: &Config, json: bool, interactive: bool) -> Result<()> {
    let acquisition = build_acquisition(config)?;

    loop {
        match acquisition.get_current_forecast().await {
            Ok(series) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&series)?);
                } else {
                    print!("{}", render::table(&series));
                }
                return Ok(());
            }
            Err(failure) => {
                eprintln!("{}", render::failure_message(&failure));
                if !interactive || !offer_retry(&failure)? {
                    return Err(failure.into());
                }
            }
        }
    }
}

/// Retry re-runs the whole acquisition, location included.
fn offer_retry(failure: &AcquisitionFailure) -> Result<bool> {
    match failure.recovery() {
        Recovery::OpenSettings => Ok(false),
        Recovery::Retry => Confirm::new("Retry?")
            .with_default(true)
            .prompt()
            .context("Failed to read retry answer"),
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;
    let current = config.fixed_coordinate();

    let mut latitude = CustomType::<f64>::new("Latitude:")
        .with_error_message("Please enter a decimal number, e.g. 52.52");
    if let Some(c) = current {
        latitude = latitude.with_default(c.latitude);
    }
    let latitude = latitude.prompt().context("Failed to read latitude")?;

    let mut longitude = CustomType::<f64>::new("Longitude:")
        .with_error_message("Please enter a decimal number, e.g. 13.405");
    if let Some(c) = current {
        longitude = longitude.with_default(c.longitude);
    }
    let longitude = longitude.prompt().context("Failed to read longitude")?;

    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        anyhow::bail!("Coordinate {latitude}, {longitude} is out of range");
    }

    let diagnostics = Confirm::new("Log network diagnostics?")
        .with_default(config.diagnostics_enabled())
        .prompt()
        .context("Failed to read diagnostics answer")?;

    config.set_fixed_coordinate(Coordinate::new(latitude, longitude));
    config.diagnostics = Some(diagnostics);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn show_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["forecast", "show", "--lat", "-33.87", "--lon", "151.21"])
            .expect("parse");
        match cli.command {
            Command::Show { lat, lon, .. } => {
                assert_eq!(lat, Some(-33.87));
                assert_eq!(lon, Some(151.21));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn show_requires_both_halves_of_a_coordinate() {
        assert!(Cli::try_parse_from(["forecast", "show", "--lat", "1.0"]).is_err());
    }
}
