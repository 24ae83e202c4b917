use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "reddit_stream=info,stream=info,warn";

/// Install the global subscriber: `RUST_LOG` (or a sane default) filter,
/// compact output, JSON lines when `STREAM_LOG_JSON=1`.
/// Returns false if a subscriber was already set.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("STREAM_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).try_init().is_ok()
    } else {
        registry.with(fmt::layer().compact()).try_init().is_ok()
    }
}
