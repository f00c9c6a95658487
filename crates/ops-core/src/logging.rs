//! tracing subscriber setup shared by every binary

use serde::Deserialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event (CloudWatch-friendly)
    Json,
}

/// Install the global subscriber.
///
/// `default_directives` is used when `RUST_LOG` is unset, e.g.
/// `"info,ops_web=debug"`. Calling this twice is harmless; the second
/// install is ignored.
pub fn init(default_directives: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().compact())
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true)
                    .with_ansi(false),
            )
            .with(filter)
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}
