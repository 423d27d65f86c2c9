//! Structured logging for the provider.
//!
//! Logs go to **stderr**; stdout belongs to the orchestrating engine. Every
//! lifecycle operation runs inside a span (`resource.create`,
//! `provider.read_data_source`, ...) carrying the resource type, so a filter
//! such as `hemmer_provider_gitlab::resource=debug` shows the payloads sent
//! for each call.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `debug`, `hemmer_provider_gitlab=debug`)
//!
//! # Examples
//!
//! ```bash
//! # Show debug logs for the provider only
//! RUST_LOG=hemmer_provider_gitlab=debug ./hemmer-provider-gitlab
//!
//! # Trace pagination walks
//! RUST_LOG=hemmer_provider_gitlab::pagination=trace ./hemmer-provider-gitlab
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn subscriber(default_level: &str) -> impl tracing::Subscriber + Send + Sync {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_gitlab::init_logging;
///
/// fn main() {
///     init_logging();
///     tracing::info!("Provider starting");
/// }
/// ```
pub fn init_logging() {
    subscriber("info").init();
}

/// Initialize logging with `default_level` used when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Unlike [`init_logging`], this does not panic when a subscriber is already
/// set, which makes it safe to call from every test.
pub fn try_init_logging() -> bool {
    subscriber("info").try_init().is_ok()
}
