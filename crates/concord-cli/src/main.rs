//! Concord CLI - Collaborative scoring from pairwise comparisons.

use std::process;

use anyhow::Context;
use clap::Parser;
use concord_cli::commands;
use concord_cli::{exit_code, logging, Cli, Command, Formatter, EXIT_SUCCESS};

fn main() {
    let cli = Cli::parse();
    let color_enabled = !cli.no_color;
    logging::init(cli.verbose, cli.quiet, color_enabled);

    let formatter = Formatter::new(cli.format, color_enabled);
    let code = match run(cli.command, &formatter) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("{}", formatter.error(&format!("{:#}", e)));
            exit_code(&e)
        }
    };
    process::exit(code);
}

fn run(command: Command, formatter: &Formatter) -> anyhow::Result<()> {
    match command {
        Command::Run(args) => {
            let input = args.input.display().to_string();
            commands::execute_run(args, formatter).with_context(|| format!("Scoring {} failed", input))
        }
        Command::Config(args) => commands::execute_config(args, formatter).context("Resolving configuration failed"),
        Command::Validate(args) => {
            let input = args.input.display().to_string();
            commands::execute_validate(args, formatter).with_context(|| format!("{} is not a valid input directory", input))
        }
    }
}
