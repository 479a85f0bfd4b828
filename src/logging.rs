use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects `debug` and the
/// configured level is used.
pub fn init_tracing(verbose: bool, default_level: &str) {
    let fallback = if verbose { "debug" } else { default_level };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Ignore the error when a subscriber is already set (tests, embedding).
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
