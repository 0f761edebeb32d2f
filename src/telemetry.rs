//! Telemetry initialization.
//!
//! Controlled by `<ENV_LOG_LEVEL>` (§6.6; defaults to `"info"` filtering
//! when unset) and `<ENV_LOG_JSON>` (any non-empty value switches the
//! writer from compact human-readable lines to newline-delimited JSON).
//! No-op until [`init`] is called; dropping the returned guard restores
//! nothing (there is no exporter to shut down) but gives call sites a
//! single RAII handle to hold for the life of the process, matching the
//! teacher's guard-on-drop shape.

use tracing_subscriber::EnvFilter;

use crate::config::{ENV_LOG_JSON, ENV_LOG_LEVEL};

/// Opaque guard. Holding it (rather than discarding the return value of
/// [`init`]) keeps call sites honest about when telemetry is live.
pub struct TelemetryGuard(());

/// Initialize structured logging from the environment.
///
/// Reads `<ENV_LOG_LEVEL>` as an `EnvFilter` directive string (e.g.
/// `"info"`, `"agentsync=debug,warn"`); falls back to `"info"` if unset or
/// invalid. Reads `<ENV_LOG_JSON>`: any non-empty value selects
/// newline-delimited JSON output on stderr instead of compact text.
#[must_use]
pub fn init() -> TelemetryGuard {
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let filter = std::env::var(ENV_LOG_LEVEL)
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    let json = std::env::var(ENV_LOG_JSON).is_ok_and(|v| !v.is_empty());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        let _ = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE),
            )
            .try_init();
    } else {
        let _ = registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init();
    }

    TelemetryGuard(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic_with_no_env_set() {
        std::env::remove_var(ENV_LOG_LEVEL);
        std::env::remove_var(ENV_LOG_JSON);
        let _guard = init();
    }
}
