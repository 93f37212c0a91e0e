use std::env::var;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init() {
    initialize_tracing(LevelFilter::INFO);
}

/// Initialize tracing with the default level lowered to DEBUG when the
/// verbose diagnostics toggle is set.
pub fn init_with_verbosity(verbose: bool) {
    initialize_tracing(if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO });
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default
/// directive; `RUST_LOG_FORMAT=json` switches to structured output.
fn initialize_tracing(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = var("RUST_LOG_FORMAT").unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer).init();
}
