//! nimvault CLI entry point.

use clap::Parser;
use nimvault::cli::args::{Cli, Commands};
use nimvault::cli::output::Output;
use nimvault::cli::{cleanup, convert};
use nimvault::config::Config;
use nimvault::error::{Result, exit_code};
use nimvault::logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported through clap as well
            let code = if e.use_stderr() {
                exit_code::GENERAL_ERROR
            } else {
                exit_code::SUCCESS
            };
            let _ = e.print();
            return ExitCode::from(code as u8);
        }
    };

    let output = Output::new(cli.output_format(), cli.quiet);

    match run(&cli, &output) {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            if !cli.quiet {
                output.error(&e.to_string());
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli, output: &Output) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config.log_level, cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Cleanup(args) => cleanup::run(args, &config, output),
        Commands::Convert(args) => convert::run(args, &config, output),
    }
}
