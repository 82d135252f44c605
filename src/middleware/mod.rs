//! Request-tracing middleware.

pub mod codec;
pub mod context;
pub mod headers;
pub mod skip;
pub mod trace;
