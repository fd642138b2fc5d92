//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blackbox")]
#[command(about = "Blackbox - discover hidden rules with budgeted queries", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the .blackbox directory, default config and progress database
    Init(InitArgs),

    /// List catalog tasks with your progress
    Levels(LevelsArgs),

    /// Play one task interactively
    Play(PlayArgs),

    /// Show your recorded progress
    Progress(ProgressArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    /// Participant name, used to key progress
    #[arg(short, long, env = "BLACKBOX_USER")]
    pub user: String,
}

#[derive(Args, Debug)]
pub struct LevelsArgs {
    #[command(flatten)]
    pub user: UserArgs,

    /// Only show one category (numerical or lexical)
    #[arg(short, long)]
    pub category: Option<String>,

    /// Suggest a random task you have not completed
    #[arg(short, long)]
    pub random: bool,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    pub user: UserArgs,

    /// Task to play; a random incomplete task when omitted
    pub task_id: Option<String>,

    /// Override the round duration in seconds
    #[arg(long)]
    pub round_seconds: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ProgressArgs {
    #[command(flatten)]
    pub user: UserArgs,
}
