//! CLI command implementations

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::observability::{log_event, Event};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::handler::handle_line;
use super::io::{error_response, ok_response, read_request, read_requests, write_json};

/// Subdirectory of `data_dir` holding one index directory per collection
const COLLECTIONS_DIR: &str = "collections";

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Start { config } => start(&config),
        Command::Query { config } => query(&config),
    }
}

/// Initialize a new data directory
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let collections = collections_dir(&config);

    if collections.exists() {
        return Err(CliError::already_initialized());
    }

    fs::create_dir_all(&collections).map_err(|e| {
        CliError::config_error(format!(
            "Failed to create directory {}: {}",
            collections.display(),
            e
        ))
    })?;

    write_json(&ok_response(json!({"initialized": true})))
}

/// Open the catalog and serve requests from stdin until EOF
pub fn start(config_path: &Path) -> CliResult<()> {
    let catalog = open_catalog(config_path)?;
    log_event(Event::Serving, &[]);

    for line in read_requests() {
        match line {
            Ok(line) => write_json(&handle_line(&catalog, &line))?,
            Err(e) => {
                // stdin is gone; nothing more can be read
                write_json(&error_response(e.code_str(), e.message()))?;
                break;
            }
        }
    }
    Ok(())
}

/// Execute a single request read from stdin and exit
pub fn query(config_path: &Path) -> CliResult<()> {
    let catalog = open_catalog(config_path)?;
    let line = read_request()?;
    write_json(&handle_line(&catalog, &line))
}

fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    config.apply_log_level();
    Ok(config)
}

fn collections_dir(config: &Config) -> PathBuf {
    config.data_path().join(COLLECTIONS_DIR)
}

fn open_catalog(config_path: &Path) -> CliResult<Catalog> {
    let config = load_config(config_path)?;
    let collections = collections_dir(&config);
    if !collections.is_dir() {
        return Err(CliError::not_initialized());
    }
    Ok(Catalog::open(collections, config.store).with_index_config(config.index))
}
