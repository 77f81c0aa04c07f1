pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "ecoexlab")]
#[command(about = "A laboratory for public goods experiments with programmed agents")]
pub struct CliArgs {
    /// TOML experiment configuration; the built-in demo setup runs when omitted
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    #[arg(long, short = 'o', help = "Override the output directory")]
    pub output: Option<String>,

    #[arg(long, help = "Override the number of rounds")]
    pub rounds: Option<usize>,

    #[arg(long, help = "Override the random seed")]
    pub seed: Option<u64>,

    #[arg(long, help = "Log resource usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Validate the configuration without running")]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}
