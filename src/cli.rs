//! Command-line interface for field-upload.
//!
//! Subcommands replay upload scenarios against the controller and print the
//! default configuration.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use field_upload_config::Config;

use crate::scenario::{Replay, Scenario};

/// field-upload - replay file-upload field scenarios
#[derive(Parser, Debug)]
#[command(name = "field-upload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (off, error, warn, info, debug, trace); overrides RUST_LOG and the config
    #[arg(long, global = true, value_name = "LEVEL", value_parser = parse_log_level)]
    pub log_level: Option<log::LevelFilter>,
}

fn parse_log_level(value: &str) -> Result<log::LevelFilter, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid log level `{value}`"))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a YAML scenario and print every bus message and reply as JSON lines
    Replay {
        /// Scenario file
        scenario: PathBuf,

        /// Config file (default: ~/.config/field-upload/config.yaml)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Print the default configuration as YAML
    DefaultConfig,
}

/// Result of CLI processing
pub enum CliResult {
    /// Subcommand completed
    Done,
    /// Exit with the given code
    Exit(i32),
}

/// Parse the process arguments and run the selected subcommand.
pub fn process_cli() -> CliResult {
    let cli = Cli::parse();
    match run(cli, &mut io::stdout().lock()) {
        Ok(()) => CliResult::Done,
        Err(e) => {
            eprintln!("field-upload: error: {e:#}");
            CliResult::Exit(1)
        }
    }
}

/// Run `cli`, writing command output to `out`.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    match cli.command {
        Commands::Replay { scenario, config } => {
            let config = match config {
                Some(path) => Config::load_from_path(&path)?,
                None => Config::load()?,
            };
            crate::debug::init_log_bridge(cli.log_level, config.log_level.to_level_filter());
            log::info!("Replaying {}", scenario.display());

            let scenario = Scenario::load(&scenario)?;
            let mut replay = Replay::new(&config);
            for line in replay.run(&scenario)? {
                let json = serde_json::to_string(&line).context("Failed to encode replay line")?;
                writeln!(out, "{json}")?;
            }
            Ok(())
        }
        Commands::DefaultConfig => {
            let yaml = serde_yaml_ng::to_string(&Config::default())
                .context("Failed to encode default config")?;
            write!(out, "{yaml}")?;
            Ok(())
        }
    }
}
