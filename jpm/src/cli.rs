// jpm/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use jpm_common::config::Config;
use jpm_common::error::Result;

pub mod add;
pub mod install;
pub mod status;

use crate::cli::add::AddArgs;
use crate::cli::install::InstallArgs;

#[derive(Parser, Debug)]
#[command(author, version, about = "kind of like npm but with less functionality", long_about = None, name = "jpm", bin_name = "jpm")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project directory containing package.json (defaults to the current directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install every dependency listed in package.json
    Install(InstallArgs),
    /// Add a dependency to package.json without installing it
    Add(AddArgs),
}

impl Command {
    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Install(command) => command.run(config).await,
            Self::Add(command) => command.run(config).await,
        }
    }
}
