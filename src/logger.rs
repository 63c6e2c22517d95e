//! Logging setup for binaries built on this crate.

use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a stderr `tracing` subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_filter` (e.g. `"info"`) when `RUST_LOG` is unset
/// or invalid. Calling this more than once is harmless.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .is_ok();

    if installed {
        debug!("Logging initialized with default filter {:?}", default_filter);
    }
}
