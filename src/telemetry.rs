//! Telemetry initialization: tracing subscriber with env-filter and fmt output.
//!
//! Span export is not wired here; finished spans leave the process through
//! whatever [`crate::tracer::SpanSink`] the embedder installs.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies to this
/// crate and `tower_http`.
pub fn init_tracing(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "trace_gate={default_level},tower_http={default_level}"
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
