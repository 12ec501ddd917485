use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Export imaging mass spectrometry spot data per region to CSV
#[derive(Parser, Debug)]
#[command(name = "spot-export", version)]
#[command(about = "Export per-spot feature intensities of leaf regions to CSV")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List feature lists and leaf regions of a source file
    Inspect {
        /// Source file (.json)
        source: PathBuf,
    },

    /// Write one CSV row per spot of the selected regions
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Source file (.json)
    pub source: PathBuf,

    /// Destination CSV file
    pub output: PathBuf,

    /// Feature list to export, by id or name
    #[arg(long, short = 'f', env = "SPOT_EXPORT_FEATURE_LIST")]
    pub feature_list: String,

    /// Restrict the export to leaf regions with this display name (repeatable)
    #[arg(long = "region", short = 'r')]
    pub regions: Vec<String>,
}
