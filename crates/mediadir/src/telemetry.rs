//! Console tracing setup for the `mediadir` binary.

use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,mediadir=debug";

/// Filter directives for the given verbosity.
///
/// `RUST_LOG` wins when set. Otherwise verbose runs log everything at debug.
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    })
}

/// Initialize console-only telemetry.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_console_telemetry(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()?;

    info!(verbose, "Telemetry initialized");
    Ok(())
}
