//! Logging setup.
//!
//! Emits JSON lines when `log_json` is set so batch runs can be ingested by the
//! same tooling as the rest of our jobs, plain `fmt` output otherwise.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::common::config::AppCfg;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(cfg: &AppCfg) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("titanic={}", cfg.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    // A second init (tests, embedding) is harmless; keep the first subscriber.
    let _ = if cfg.log_json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
}
