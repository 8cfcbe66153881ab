//! Logging-Initialisierung fuer das Konsolen-Binary
//!
//! `HUSH_LOG_LEVEL` ueberschreibt das konfigurierte Level,
//! `HUSH_LOG_FORMAT` das Format ("json" oder "text").

use tracing_subscriber::{fmt, EnvFilter};

/// Initialisiert tracing-subscriber mit dem konfigurierten Level und Format
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = EnvFilter::try_from_env("HUSH_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(level));
    let format = std::env::var("HUSH_LOG_FORMAT").unwrap_or_else(|_| format.to_string());

    // Logs gehen nach stderr, stdout gehoert der Konsolen-UI
    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
