//! Tracing initialization.
//!
//! The diagnostic capture layer is installed alongside the fmt layer so
//! every log record emitted inside an orchestration span also lands in that
//! request's bundle. Production gets JSON output, development pretty output.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tubenote_core::Config;
use tubenote_infra::DiagnosticCapture;

pub fn init(config: &Config, capture: &DiagnosticCapture) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(capture.layer());

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}
