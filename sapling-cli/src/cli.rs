//! Command line definition

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};

/// Generate a Weber-Penn tree from a parameter preset and print a summary
#[derive(Parser, Debug)]
#[command(name = "sapling")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON preset to load; built-in defaults when omitted
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub preset: Option<PathBuf>,

    /// Seed for this run; overrides the preset's own seed
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Cap the tree at two levels and hide leaves
    #[arg(long)]
    pub limit_import: bool,

    /// Print the whole generation as JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Write the resolved parameters as a preset file and exit
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub save_preset: Option<PathBuf>,

    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub debug: u8,
}
