#![allow(clippy::cargo_common_metadata)]
use serena_cli::{cli, config::Config, error::exitcode, exit_code, setup_logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Parse command line arguments
    let args = cli::parse_args();

    // Setup logging based on debug flag
    if let Err(e) = setup_logging(args.debug) {
        eprintln!("error: {e:#}");
        return ExitCode::from(exitcode::SOFTWARE);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(args: &cli::Args) -> anyhow::Result<()> {
    // Initialize configuration
    let config = Config::from_args(args)?;

    // Execute the appropriate command
    cli::execute_command(&config, &args.command)
}
