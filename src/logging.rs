//! Tracing initialization
//!
//! `REPODIFF_LOG` takes an `EnvFilter` directive string, for example
//! `REPODIFF_LOG=repodiff::repository=debug,sqlx=warn`. Unset or invalid
//! values fall back to `repodiff=info` (`repodiff=warn` when quiet).

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "REPODIFF_LOG";

static INIT: Once = Once::new();

/// Install the global subscriber; later calls are no-ops
pub fn init_tracing(json: bool, quiet: bool) {
    INIT.call_once(|| {
        let default = if quiet { "repodiff=warn" } else { "repodiff=info" };
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

        let registry = tracing_subscriber::registry().with(filter);
        if json {
            registry
                .with(fmt::layer().json().with_writer(std::io::stderr).with_current_span(true))
                .init();
        } else {
            registry
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    });
}
