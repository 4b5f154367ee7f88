use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,rosrl_core=info,rosrl_api=info";

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to info level. Only the first
/// call installs anything, later calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
