//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Slipstream - self-updating application delivery
#[derive(Parser, Debug)]
#[command(name = "slipstream")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the update configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Check the feed for an available update
    Check(CheckArgs),

    /// Download the pending update batch
    Download(DownloadArgs),

    /// Download and install the pending update
    Apply(ApplyArgs),

    /// Uninstall the application
    Uninstall(UninstallArgs),
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Download command
#[derive(Args, Debug)]
pub struct DownloadArgs {}

// Apply command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Skip the first-run launch of freshly installed applications
    #[arg(long)]
    pub silent: bool,
}

// Uninstall command
#[derive(Args, Debug)]
pub struct UninstallArgs {
    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}
