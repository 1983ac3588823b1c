/// Tracing initialization.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the log filter, e.g. `refgraph=debug`.
const LOG_ENV: &str = "REFGRAPH_LOG";

/// Filter used when `REFGRAPH_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "refgraph=warn";

/// Install the stderr subscriber. Calling it again is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| return EnvFilter::new(DEFAULT_FILTER));
    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .try_init();
    if installed.is_err() {
        tracing::debug!("subscriber already installed");
    }
}
