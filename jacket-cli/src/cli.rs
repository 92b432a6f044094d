use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::Password;
use jacket_core::{
    Config, ProviderId, VenueType,
    provider::{openweather_from_config, recommender_from_config},
};
use std::{net::SocketAddr, sync::Arc};

use crate::{ask, output, server};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "jacket",
    version,
    about = "Do you need a jacket? JacketScore, powered by AI."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key for a provider ("openweather" or "openai").
    Configure {
        provider: String,
    },

    /// Fill in the outing form and get a jacket score with a recommendation.
    Ask,

    /// Score weather you already know. No network calls.
    Score {
        /// Temperature in °F.
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,

        /// Wind speed in mph.
        #[arg(long, default_value_t = 0.0)]
        wind: f64,

        /// Precipitation descriptor, e.g. "light rain" or "clear sky".
        #[arg(long, default_value = "clear sky")]
        precipitation: String,

        /// Indoors or Outdoors.
        #[arg(long, default_value = "Outdoors")]
        venue: VenueType,
    },

    /// Serve the forecast, score and recommendation endpoints over HTTP.
    Serve {
        #[arg(long, env = "APP_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(long, env = "APP_PORT", default_value_t = 8080)]
        port: u16,
    },
}

impl Cli {
    /// `RUST_LOG` wins; otherwise the server logs requests and the
    /// interactive commands stay quiet.
    pub fn default_log_filter(&self) -> &'static str {
        match self.command {
            Command::Serve { .. } => "jacket=debug,jacket_core=info,tower_http=info",
            _ => "warn",
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Ask => {
                let config = Config::load_with_env()?;
                ask::run(&config).await
            }
            Command::Score {
                temperature,
                wind,
                precipitation,
                venue,
            } => {
                let table = Config::load()?.score_table();
                let score = table.score(temperature, wind, &precipitation, venue);
                println!("{}", output::render_score(&score));
                Ok(())
            }
            Command::Serve { host, port } => {
                let config = Config::load_with_env()?;
                let weather = openweather_from_config(&config)?;
                let state = server::AppState {
                    forecast: weather.clone(),
                    places: weather,
                    recommender: recommender_from_config(&config)?,
                    table: Arc::new(config.score_table()),
                };

                let addr: SocketAddr = format!("{host}:{port}")
                    .parse()
                    .with_context(|| format!("Invalid listen address {host}:{port}"))?;
                server::serve(server::build_app(state), addr).await
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .with_help_message(&format!(
            "Stored in the config file; {} overrides it",
            id.env_var()
        ))
        .prompt()?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(id, api_key.to_string());
    config.save()?;

    println!("Saved {id} key to {}", Config::config_file_path()?.display());
    Ok(())
}
