//! Config command implementation.

use std::path::Path;

use concord_pipeline::PipelineConfig;
use tracing::debug;

use crate::cli::ConfigArgs;
use crate::error::Result;
use crate::output::Formatter;

/// Resolve the pipeline configuration: the file when given, the preset otherwise.
pub fn load_config(path: Option<&Path>, preset: &str) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            PipelineConfig::from_file(path)?
        }
        None => {
            debug!("Using '{}' preset", preset);
            PipelineConfig::preset(preset)?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Execute the config command.
pub fn execute_config(args: ConfigArgs, formatter: &Formatter) -> Result<()> {
    let config = load_config(args.config.as_deref(), &args.preset)?;
    println!("{}", formatter.format_config(&config)?);
    Ok(())
}
