//! Tracing subscriber setup for the CLI

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "LEDGERLINE_LOG";

/// Install the global subscriber; logs go to stderr so stdout stays parseable
pub fn init(verbose: bool, json: bool) {
    let default_directive = if verbose {
        "ledgerline=debug,ledgerline_core=debug,warn"
    } else {
        "ledgerline=info,ledgerline_core=info,warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer.compact()).init();
    }
}
