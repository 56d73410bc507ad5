//! Clipcast CLI: drive the recorder against the synthetic platform.
//!
//! Usage:
//!   clipcast simulate [OPTIONS]   Run one scripted recording and export it
//!   clipcast config [--write]     Show (or write) the effective configuration
//!   clipcast check                Report platform capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use clipcast_common::config::RecorderConfig;
use clipcast_common::logging::{init_logging, level_for_verbosity};

mod commands;

#[derive(Parser)]
#[command(
    name = "clipcast",
    about = "Screen and microphone recorder, simulated end to end",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one recording session with scripted consent and chunks
    Simulate {
        /// Sizes of the chunks the recorder delivers, in order
        #[arg(long, value_delimiter = ',', default_value = "4096,0,2048")]
        chunks: Vec<usize>,

        /// Where to write the exported recording
        #[arg(short, long, default_value = "recording.webm")]
        output: PathBuf,

        /// Deny the screen capture prompt
        #[arg(long)]
        deny_screen: bool,

        /// Deny the microphone prompt
        #[arg(long)]
        deny_mic: bool,

        /// End the shared screen track after this many chunks
        #[arg(long)]
        end_track_after: Option<usize>,

        /// Print the artifact metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the standard config location
        #[arg(long)]
        write: bool,
    },

    /// Check platform capabilities and configuration
    Check,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RecorderConfig::load_from(path)?,
        None => RecorderConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = level_for_verbosity(true).to_string();
    }
    init_logging(&logging);

    match cli.command {
        Commands::Simulate {
            chunks,
            output,
            deny_screen,
            deny_mic,
            end_track_after,
            json,
        } => {
            let scenario = commands::simulate::Scenario {
                chunks,
                deny_screen,
                deny_mic,
                end_track_after,
            };
            commands::simulate::run(config, scenario, output, json).await
        }
        Commands::Config { write } => commands::config::run(config, write),
        Commands::Check => commands::check::run(config),
    }
}
