// Logging initialization
use tracing_subscriber::{
    fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// RUST_LOG wins when set; otherwise debug when verbose, warn when not
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for the completion line and exports.
    // Repeat initialization is ignored, the first subscriber stays installed.
    tracing_subscriber::registry()
        .with(fmt::layer().compact().without_time().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}
