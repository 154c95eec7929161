//! Tracing setup for the CLI binary.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. `RUST_LOG` wins over the verbosity
/// flag when set.
pub fn init(verbose: u8) {
    let default_directive = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
