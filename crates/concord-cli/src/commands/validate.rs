//! Validate command implementation.

use concord_store::InputDir;

use crate::cli::ValidateArgs;
use crate::error::Result;
use crate::output::{Formatter, InputSummary};

/// Execute the validate command.
///
/// Loads every input file with the same schema checks as `run`, without
/// computing any score.
pub fn execute_validate(args: ValidateArgs, formatter: &Formatter) -> Result<()> {
    let state = InputDir::new(&args.input).load()?;
    let summary = InputSummary::from_state(&state);

    let output = formatter.format_inputs(&args.input, &summary)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
