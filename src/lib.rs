//! Trace Gate - HTTP request-tracing boundary
//!
//! Observes every inbound request/response cycle, establishes or continues
//! a distributed trace, and exposes the trace identifiers both to the
//! application (via a request extension) and to the caller (via response
//! headers).

pub mod config;
pub mod error;
pub mod middleware;
pub mod telemetry;
pub mod tracer;

pub use config::Config;
pub use error::{AppError, Result};
pub use middleware::trace::RequestTraceLayer;
pub use tracer::Tracer;
