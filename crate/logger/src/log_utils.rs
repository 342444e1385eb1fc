use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static LOG_INIT: Once = Once::new();

/// Fallback filter when neither `RUST_LOG` nor a default is provided
const DEFAULT_FILTER: &str = "warn";

/// Initialize the global tracing subscriber, once per process.
///
/// `RUST_LOG` takes precedence; otherwise `default_value` (or `warn`) is used.
/// Traces go to stderr so that they never mix with the demonstration output.
pub fn log_init(default_value: Option<&str>) {
    LOG_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default_value.unwrap_or(DEFAULT_FILTER).to_owned());
        tracing_setup(&filter);
    });
}

fn tracing_setup(filter: &str) {
    let format = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true)
        .compact();

    // a subscriber may already be installed by a test harness
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(format)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::log_init;

    #[test]
    fn log_init_is_idempotent() {
        log_init(Some("debug"));
        log_init(None);
        tracing::info!("logger initialized twice without panicking");
    }
}
