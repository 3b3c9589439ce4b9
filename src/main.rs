//! driftsync CLI entry point
//!
//! This is a minimal entrypoint that:
//! 1. Installs the tracing subscriber
//! 2. Parses CLI arguments and dispatches (via cli::run)
//! 3. Prints errors to stderr
//! 4. Exits with non-zero on failure
//!
//! All logic is delegated to the CLI module. Lock contention is handled
//! inside cli::run and exits 0.

use tracing_subscriber::EnvFilter;

use driftsync::cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = cli::run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
