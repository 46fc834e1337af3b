use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn,warroom=info";

/// Install the global `tracing` subscriber.
///
/// Logs go to stderr so stdout stays machine-readable (JSON / CSV / TSV).
/// Levels are controlled by `RUST_LOG`. Calling this twice is harmless.
pub fn setup_logging() {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}
