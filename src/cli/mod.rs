//! Command-line interface module
//!
//! Provides argument parsing and command execution.

pub mod args;
pub mod commands;

pub use args::{parse_args, Args, Command, OutputFormat, ProjectCommand, QueryCommand};
pub use commands::{execute_command, execute_request};
