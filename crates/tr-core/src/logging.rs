//! Logging setup for the tr-core binary.
//!
//! stdout is reserved for command payloads (rate tables, JSON trees);
//! all log output goes to stderr. `RUST_LOG` overrides the CLI verbosity
//! flags when set.

use tracing_subscriber::EnvFilter;

pub fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tr_core={default_level},tr_bundle={default_level},tr_report={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
