use std::time::Duration;

use actionarc_domain::ActionArcError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Selects JSON log lines instead of the human-readable format.
pub const LOG_FORMAT_ENV: &str = "ACTIONARC_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.
///
/// `RUST_LOG` controls the filter (default `info`). Logs go to stderr so
/// action output on stdout stays machine-readable. Calling this twice is
/// harmless; the second call is ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let installed =
        if json_requested() { builder.json().try_init() } else { builder.try_init() };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn json_requested() -> bool {
    std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.trim().eq_ignore_ascii_case("json"))
}

/// Log the outcome of a dispatched action with structured fields.
///
/// `action` is the routed `"<agent>.<actionName>"` target; parameters are
/// never logged since they carry message bodies and addresses.
#[inline]
pub fn log_action_execution(action: &str, elapsed: Duration, error: Option<&ActionArcError>) {
    let duration_ms = elapsed.as_millis() as u64;

    match error {
        None => info!(action, duration_ms, "action_execution_success"),
        Some(err) => warn!(action, duration_ms, error_type = err.label(), error = %err, "action_execution_failure"),
    }
}
