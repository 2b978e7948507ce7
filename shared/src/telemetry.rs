use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingConfig, DEFAULT_LOG_FILTER};

/// Resolves the filter: the configured directives, else `RUST_LOG`, else
/// [`DEFAULT_LOG_FILTER`].
#[must_use]
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    resolve_filter(config, std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

fn resolve_filter(config: &LoggingConfig, rust_log: Option<&str>) -> EnvFilter {
    [Some(config.filter.as_str()), rust_log]
        .into_iter()
        .flatten()
        .filter(|directives| !directives.trim().is_empty())
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global `fmt` subscriber. Returns `false` when one is
/// already installed; later calls leave the first subscriber in place.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let installed = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(config.ansi)
                .with_target(true),
        )
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter = %config.filter, "tracing initialised");
    }
    installed
}
