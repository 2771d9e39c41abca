//! Example: Read the request id outside the handler's call chain
//!
//! The id is stored in the per-request context, so helpers deep in the call
//! stack can read it without threading it through every function.

use axum::{error_handling::HandleErrorLayer, routing::get, Router};
use std::time::{SystemTime, UNIX_EPOCH};
use reqid::{context, handle_error, IdPrefix, RequestContextLayer, ReqidConfig, ReqidLayer};
use tower::ServiceBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Rotating prefix: evaluated for every request
    let config = ReqidConfig::new(IdPrefix::generator(daily_prefix))
        .with_attribute("requestId")
        .with_set_in_context(true);

    let app = Router::new().route("/", get(handler)).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(RequestContextLayer::new())
            .layer(ReqidLayer::new(config)?),
    );

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;

    tracing::info!("Starting server on 0.0.0.0:3000");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handler() -> String {
    call_service().await
}

async fn call_service() -> String {
    let request_id = context::get("requestId").unwrap_or_default();
    tracing::info!(%request_id, "Calling external service");
    format!("Downstream call tagged with {request_id}")
}

/// Days since the unix epoch, good enough for a rotating prefix
fn daily_prefix() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("d{}", secs / 86_400)
}
