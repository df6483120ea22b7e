//! CLI argument definitions using clap
//!
//! Commands:
//! - searchdoc init --config <path>
//! - searchdoc start --config <path>
//! - searchdoc query --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// searchdoc - documents, joins and aggregation over a search engine
#[derive(Parser, Debug)]
#[command(name = "searchdoc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./searchdoc.json")]
        config: PathBuf,
    },

    /// Serve requests from stdin, one JSON object per line
    Start {
        /// Path to configuration file
        #[arg(long, default_value = "./searchdoc.json")]
        config: PathBuf,
    },

    /// Execute a single request and exit
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./searchdoc.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
