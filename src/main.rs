//! CLI Entry Point for scpi_daq
//!
//! A small console over the instruments listed in the configuration file.
//!
//! # Usage
//!
//! ```bash
//! scpi_daq list
//! scpi_daq identify scope
//! scpi_daq query scope "CHANNEL1:SCALE?"
//! scpi_daq write siggen "C1:OUTP ON"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scpi_daq::config::ScpiConfig;
use scpi_daq::instruments::AnyInstrument;
use scpi_daq::logging::{self, TracingConfig};
use scpi_daq::scpi_core::Node;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "scpi_daq")]
#[command(about = "Console for SCPI bench instruments", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = scpi_daq::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured instruments
    List,

    /// Print the `*IDN?` reply of an instrument
    Identify {
        /// Instrument id from the configuration
        id: String,
    },

    /// Send a query and print the reply
    Query {
        /// Instrument id from the configuration
        id: String,
        /// Full query, including the trailing `?`
        command: String,
    },

    /// Send a command that produces no reply
    Write {
        /// Instrument id from the configuration
        id: String,
        /// Full command
        command: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ScpiConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.application.log_level = level;
    }
    config.validate()?;

    let tracing_config = TracingConfig::from_config(&config).map_err(anyhow::Error::msg)?;
    logging::init(tracing_config).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::List => {
            for instrument in &config.instruments {
                println!(
                    "{:<12} {:<12?} {}{}",
                    instrument.id,
                    instrument.driver,
                    instrument.resource,
                    if instrument.enabled { "" } else { " (disabled)" }
                );
            }
            Ok(())
        }
        Commands::Identify { id } => {
            let instrument = connect(&config, &id)?;
            println!("{}", instrument.session().identity()?);
            Ok(())
        }
        Commands::Query { id, command } => {
            let instrument = connect(&config, &id)?;
            println!("{}", instrument.session().query(&command, None)?);
            Ok(())
        }
        Commands::Write { id, command } => {
            let instrument = connect(&config, &id)?;
            instrument.session().write(&command)?;
            Ok(())
        }
    }
}

fn connect(config: &ScpiConfig, id: &str) -> Result<AnyInstrument> {
    let definition = config.instrument(id)?;
    if !definition.enabled {
        anyhow::bail!("instrument '{}' is disabled in the configuration", id);
    }
    let instrument = AnyInstrument::connect(definition, &config.transport)?;
    info!(
        id,
        channels = instrument.channel_count(),
        "Instrument connected"
    );
    Ok(instrument)
}
