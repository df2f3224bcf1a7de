use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs JSON log output filtered by `RUST_LOG`. Safe to call more than once
/// per process; only the first call installs a subscriber.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .json()
        .try_init();
}

/// Root span for one invocation; every log line inside it carries the
/// component and environment.
pub fn invocation_span(
    component: &'static str,
    environment: Option<&str>,
    request_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "invocation",
        component,
        environment = environment.unwrap_or("unknown"),
        request_id
    )
}
