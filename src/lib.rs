pub mod config;
pub mod enrichment;
pub mod evaluation;
pub mod language;
pub mod models;
pub mod output;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// Filter priority: `DOCSTAGE_LOG`, then `RUST_LOG`, then `config::default_log_filter()`.
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(config::LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok() {
        tracing::info!("{} v{} logging initialized", config::APP_NAME, config::APP_VERSION);
    }
}
