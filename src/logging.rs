//! Tracing setup for the command line.
//!
//! Logs go to stderr so `--json` output on stdout stays parseable. The
//! filter comes from `TU_LOG` when set.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "TU_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "tu_intel=debug" } else { "tu_intel=info" }
}

/// Filter used by [`init`]: `TU_LOG` if it parses, the default otherwise.
pub fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(verbose))
        .with_target(false)
        .try_init();
}
