//! Per-request tracing bypass decision.
//!
//! Evaluated once, before context extraction, so bypassed paths pay
//! nothing beyond the decision itself.

use http::Request;

use super::context;

/// Static rules deciding whether a request bypasses tracing entirely.
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    skip_paths: Vec<String>,
}

impl SkipRules {
    /// Rules that skip the given request paths (exact match).
    pub fn new(skip_paths: Vec<String>) -> Self {
        Self { skip_paths }
    }

    /// True when tracing must be bypassed: either the caller opted out via
    /// a `0` trace level, or the path is skip-marked (health checks etc.).
    pub fn should_skip<B>(&self, request: &Request<B>) -> bool {
        if matches!(context::level_value(request.headers()), Some("0")) {
            return true;
        }
        let path = request.uri().path();
        self.skip_paths.iter().any(|p| p == path)
    }
}
