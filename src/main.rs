//! Trace Gate - demo server wiring the tracing boundary into an axum app.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use trace_gate::{
    error::AppError,
    middleware::{codec, trace::PathTemplate},
    telemetry,
    tracer::LogSink,
    Config, RequestTraceLayer, Result, Tracer,
};
use trace_gate::middleware::context::CurrentTrace;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    let config = Config::from_env()?;
    telemetry::init_tracing(&config.log_level);
    tracing::info!("Starting Trace Gate");

    let tracer = Tracer::new(Arc::new(LogSink));

    // Build router
    let app = Router::new()
        .route("/", get(index))
        .route("/users/{id}", get(show_user))
        .route("/fail", get(fail))
        .route("/healthz", get(healthz))
        .layer(
            RequestTraceLayer::new(tracer)
                .with_service_name(config.service_name.clone())
                .with_skip_paths(config.skip_paths.clone()),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Echo the identifiers of the trace this request runs under.
async fn index(trace: Option<Extension<CurrentTrace>>) -> Json<serde_json::Value> {
    match trace {
        Some(Extension(trace)) => Json(json!({
            "trace_id": codec::encode_trace_id(trace.trace_id),
            "span_id": codec::encode_span_id(trace.span_id),
        })),
        None => Json(json!({ "traced": false })),
    }
}

/// Handler demonstrating the path-template annotation.
async fn show_user(Path(id): Path<u64>) -> Response {
    let mut response = Json(json!({ "id": id })).into_response();
    response
        .extensions_mut()
        .insert(PathTemplate("/users/{id}".to_string()));
    response
}

/// Always fails, demonstrating the status-only span error on 5xx.
async fn fail() -> AppError {
    AppError::Internal("deliberate failure".to_string())
}

async fn healthz() -> &'static str {
    "ok"
}
