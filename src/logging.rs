//! Diagnostic logging setup.
//!
//! Events go to stderr so JSON on stdout stays parseable. The filter comes
//! from `ABL_LOG` (e.g. `ABL_LOG=abl=debug`) and defaults to `warn`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "ABL_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Build the filter from `ABL_LOG`, falling back to `warn` when unset or invalid.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(env_filter())
        .try_init();
}
