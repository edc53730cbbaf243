use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config_manager::LoggingConfig;
use crate::error::{ImageTraceError, Result};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ImageTraceError::Logging(format!("invalid log level '{}': {}", config.level, e)))
}

fn format_layer(format: &str) -> Result<BoxedLayer> {
    let layer = match format {
        "compact" => fmt::layer().compact().boxed(),
        "pretty" => fmt::layer().pretty().boxed(),
        "full" => fmt::layer().boxed(),
        "json" => fmt::layer().json().boxed(),
        other => {
            return Err(ImageTraceError::Logging(format!(
                "unknown log format '{}'",
                other
            )))
        }
    };
    Ok(layer)
}

/// Install the global tracing subscriber.
///
/// Fails instead of panicking when another subscriber is already installed,
/// so hosts embedding this crate keep control over their own logging.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let layer = format_layer(&config.format)?;

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| ImageTraceError::Logging(e.to_string()))
}
