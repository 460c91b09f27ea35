//! Tracing subscriber setup for the binary.
//!
//! The library only emits events; installing a subscriber is the caller's
//! choice. Output goes to stderr so JSON on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_ENV: &str = "SCC_LOG";
pub const DEFAULT_LEVEL: &str = "warn";

/// Install a global fmt subscriber. `verbose` raises the fallback level to `debug`.
/// A filter in `SCC_LOG` always wins. Repeated calls are no-ops.
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { DEFAULT_LEVEL };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
