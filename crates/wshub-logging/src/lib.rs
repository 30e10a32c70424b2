//! # wshub-logging
//!
//! Structured logging with `tracing`.
//!
//! [`init_subscriber`] installs the global subscriber from [`LoggingSettings`]:
//! an [`EnvFilter`] built from the configured level and per-module overrides
//! (replaced wholesale by `RUST_LOG` when set), and a stderr `fmt` layer in
//! compact or JSON form.
//!
//! With the `testing` feature, [`capture`] provides an in-memory layer for
//! asserting on emitted events.
//!
//! [`EnvFilter`]: tracing_subscriber::EnvFilter

#![deny(unsafe_code)]

#[cfg(any(test, feature = "testing"))]
pub mod capture;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wshub_settings::{LogFormat, LoggingSettings};

/// Render the filter directives for `settings`, e.g.
/// `info,wshub_server::websocket::monitor=debug`.
pub fn filter_directives(settings: &LoggingSettings) -> String {
    let mut directives = settings.level.as_filter_str().to_owned();
    for (target, level) in &settings.module_levels {
        directives.push(',');
        directives.push_str(target);
        directives.push('=');
        directives.push_str(level.as_filter_str());
    }
    directives
}

/// Build the [`EnvFilter`]. `RUST_LOG` wins when present and valid.
pub fn build_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(filter_directives(settings))
            .unwrap_or_else(|_| EnvFilter::new(settings.level.as_filter_str()))
    })
}

/// Initialize the global tracing subscriber.
///
/// Call once at application startup. Subsequent calls are no-ops.
pub fn init_subscriber(settings: &LoggingSettings) {
    let filter = build_filter(settings);

    let (json, compact) = match settings.format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
        LogFormat::Compact => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            ),
        ),
    };

    // try_init fails if a global subscriber is already set
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(compact)
        .try_init();
}
