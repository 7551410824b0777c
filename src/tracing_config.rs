use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for the widget.
///
/// Uses the `RUST_LOG` environment variable if set, otherwise the given
/// default level. Pretty console output by default; set
/// `MEDIABAR_LOG_FORMAT=json` for JSON output.
///
/// # Errors
/// Returns error if tracing subscriber initialization fails
pub fn init(default_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let format = env::var("MEDIABAR_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let registry = tracing_subscriber::registry().with(env_filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_target(true).with_level(true))
                .try_init()?;
        }
        _ => {
            registry
                .with(fmt::layer().pretty().with_target(true).with_level(true))
                .try_init()?;
        }
    }

    Ok(())
}
