use crate::config::LogConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        let layer = fmt::layer().json().with_target(true).with_ansi(false);
        registry.with(layer).try_init()?;
    } else {
        let layer = fmt::layer().with_target(false);
        registry.with(layer).try_init()?;
    }

    Ok(())
}
