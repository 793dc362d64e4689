//! Run command implementation.

use concord_pipeline::Sequential;
use tracing::info;

use crate::cli::RunArgs;
use crate::commands::load_config;
use crate::error::Result;
use crate::output::Formatter;

/// Execute the run command.
pub fn execute_run(args: RunArgs, formatter: &Formatter) -> Result<()> {
    let mut config = load_config(args.config.as_deref(), &args.preset)?;

    // Command-line overrides
    if let Some(max_workers) = args.max_workers {
        config.max_workers = max_workers;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.snapshot {
        config.snapshot = true;
    }

    info!(
        "Scoring {} into {}",
        args.input.display(),
        args.output.display()
    );
    let run = Sequential::new(config).run_directory(&args.input, &args.output)?;

    let output = formatter.format_run(&run, &args.output, args.top)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
