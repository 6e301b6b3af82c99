use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Map a numeric verbosity (0 = most verbose) to a level filter.
///
/// `0` shows debug messages, `1` info, `2` warnings and anything higher
/// errors only.
pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::DEBUG,
        1 => LevelFilter::INFO,
        2 => LevelFilter::WARN,
        _ => LevelFilter::ERROR,
    }
}

fn is_known_format(format: &str) -> bool {
    matches!(format, "" | "compact" | "json")
}

/// Install the global subscriber. `RUST_LOG` directives take precedence over
/// `level`, and `RUST_LOG_FORMAT=json` selects structured output.
pub fn init(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = var("RUST_LOG_FORMAT").unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer).init();

    if !is_known_format(&log_format) {
        warn!("Unknown RUST_LOG_FORMAT {log_format:?}, using compact output");
    }
}
