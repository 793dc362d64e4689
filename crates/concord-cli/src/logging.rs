//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Filter directives for the verbosity flags.
///
/// `--verbose` and `--quiet` take precedence over `RUST_LOG`; without
/// either flag `RUST_LOG` applies, falling back to `info`.
pub fn filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber writing to stderr.
///
/// Calling it twice keeps the first subscriber.
pub fn init(verbose: bool, quiet: bool, color: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbose, quiet))
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(false)
        .try_init();
}
