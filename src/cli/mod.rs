//! CLI module for searchdoc
//!
//! Provides command-line interface for:
//! - init: Create the data directory
//! - start: Open the catalog and enter the serving loop
//! - query: One-shot request execution

mod args;
mod commands;
mod errors;
mod handler;
mod io;

pub use args::{Cli, Command};
pub use commands::{init, query, run, run_command, start};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use handler::{handle_line, handle_request, Request};
pub use io::{error_response, ok_response, read_request, read_requests, write_json};
