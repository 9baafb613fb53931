use tracing_subscriber::EnvFilter;

use crate::config::env_bool;

/// Installs the process-wide subscriber. `RUST_LOG` overrides the default
/// `info` filter; `JOBDASH_LOG_JSON=1` switches to JSON lines.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env_bool("JOBDASH_LOG_JSON").unwrap_or(false) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
