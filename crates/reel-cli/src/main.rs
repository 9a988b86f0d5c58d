//! Reel CLI - Headless Embed Simulator
//!
//! Features:
//! - Player script URL resolution
//! - Plugin list resolution
//! - Embed configuration inspection from element attributes
//! - Scripted page simulation against the headless host

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;
mod scenario;

/// Reel CLI - Video embed toolkit
#[derive(Parser)]
#[command(name = "reel-cli")]
#[command(version)]
#[command(about = "Video embed simulation and inspection toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the player script URL for an account/player pair
    ScriptUrl {
        /// Account id
        #[arg(short, long)]
        account: String,

        /// Player id
        #[arg(short, long)]
        player: String,

        /// Host serving player scripts
        #[arg(long, default_value = "players.brightcove.net")]
        host: String,
    },

    /// Resolve the plugin list for enabled/disabled names
    Plugins {
        /// Space-separated enabled plugins
        #[arg(short, long, default_value = "playback")]
        enabled: String,

        /// Space-separated disabled plugins
        #[arg(short, long, default_value = "")]
        disabled: String,
    },

    /// Parse element attributes into a configuration and describe the embed
    Inspect {
        /// Attribute as name=value (repeatable)
        #[arg(short, long = "attr", value_name = "NAME=VALUE")]
        attrs: Vec<String>,
    },

    /// Run a scenario file against the headless host
    Simulate {
        /// Path to the scenario JSON
        scenario: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    reel_core::init();

    match cli.command {
        Commands::ScriptUrl { account, player, host } => {
            commands::script_url(&host, &account, &player, &cli.format)?;
        }
        Commands::Plugins { enabled, disabled } => {
            commands::plugins(&enabled, &disabled, &cli.format)?;
        }
        Commands::Inspect { attrs } => {
            commands::inspect(&attrs, &cli.format)?;
        }
        Commands::Simulate { scenario } => {
            commands::simulate(&scenario, &cli.format).await?;
        }
    }

    Ok(())
}
