static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install the global tracing subscriber. `RUST_LOG` wins over `level`;
/// an unrecognised `level` falls back to info with a warning.
pub fn init_tracing_once(level: &str) {
    INIT_ONCE.call_once(|| {
        let configured = log_filter_for(level);
        let env_filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| configured.unwrap_or("info").to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
        if configured.is_none() {
            tracing::warn!("Invalid log level: {}. Defaulting to INFO.", level);
        }
    });
}

/// Map a configured level name (case-insensitive) onto a tracing filter directive.
pub fn log_filter_for(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" => Some("error"),
        _ => None,
    }
}

/// Double-quote an SQL identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
