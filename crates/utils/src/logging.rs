//! provides logging helpers

use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// Environment variable holding the log filter directives, e.g. `time_sharing=debug`
pub const LOG_ENV_VAR: &str = "DEVICE_PLUGIN_LOG";

/// initiate the global tracing subscriber
///
/// Logs go to stderr so stdout stays free for command output.
pub fn init() {
    init_with_default(filter::LevelFilter::INFO);
}

/// initiate the global tracing subscriber with a default level used when
/// [`LOG_ENV_VAR`] is unset
pub fn init_with_default(default_level: filter::LevelFilter) {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let fmt_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    // a second init (e.g. from tests) keeps the first subscriber
    if registry().with(fmt_layer).try_init().is_err() {
        tracing::debug!("global tracing subscriber already set");
    }
}
