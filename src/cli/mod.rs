//! CLI module for trackdb
//!
//! Runs one tracking operation against a JSON store file and prints the
//! result as a JSON envelope on stdout.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{execute, run};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
