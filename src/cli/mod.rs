//! CLI module for KeyCut
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::adapters::TomlConfigAdapter;

pub mod args;
pub mod commands;

pub use args::{CutArgs, PlanArgs, PrintFormat, ProbeArgs, SelectionArgs};

/// KeyCut keyframe-aware video cutter
///
/// Cuts, joins and splits video files, copying packets losslessly wherever
/// cuts fall on keyframes and re-encoding only the edges that do not.
#[derive(Parser, Debug)]
#[command(name = "keycut")]
#[command(about = "KeyCut - keyframe-aware lossless video cutting")]
#[command(version)]
pub struct Cli {
    /// Logging level or filter directive
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Config file (default: per-user config directory)
    #[arg(long, global = true, env = "KEYCUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show duration, codecs and keyframes of a file
    Probe(ProbeArgs),
    /// Print the plan and tool invocations without running them
    Plan(PlanArgs),
    /// Cut the file
    Cut(CutArgs),
}

/// Load configuration and dispatch to the selected command
pub async fn run(cli: Cli) -> Result<()> {
    let store = TomlConfigAdapter::resolve(cli.config.as_deref());
    let config = store
        .load()?
        .with_env_overrides(|key| std::env::var(key).ok())?;

    match cli.command {
        Commands::Probe(args) => commands::probe(args, &config).await,
        Commands::Plan(args) => commands::plan(args, &config).await,
        Commands::Cut(args) => commands::cut(args, config, &store).await,
    }
}
