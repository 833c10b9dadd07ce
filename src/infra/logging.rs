pub fn init() {
    // Initialize tracing subscriber once, honoring RUST_LOG if set.
    // Default to info level; allow override via RUST_LOG (e.g., "debug").
    // Logs go to stderr: in stdio mode stdout carries the MCP stream.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log a metric line and hand it to the `metrics` facade. Without an
/// installed recorder the facade call is a no-op.
pub fn log_metric(tool: &'static str, metric: &'static str, value: f64) {
    tracing::debug!(tool = tool, metric = metric, value = value, "metric");
    if metric.ends_with("_total") {
        metrics::counter!(metric, "tool" => tool).increment(value as u64);
    } else {
        metrics::histogram!(metric, "tool" => tool).record(value);
    }
}
