//! Tracing bootstrap.
//!
//! Libraries only emit `tracing` events; installing a subscriber is the
//! embedding process's job. This helper wires the conventional setup:
//! env-filter from `CITA_LOG` (falling back to `info`), compact output.

use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter.
pub const LOG_ENV_VAR: &str = "CITA_LOG";

/// Install the default subscriber. Safe to call more than once: later
/// calls are no-ops (the first subscriber wins).
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init();
    tracing::debug!("tracing initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        tracing::info!("still alive after double init");
    }
}
