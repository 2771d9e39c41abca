//! Example: Attach a request id to every request and show it in logs
//!
//! Run with `RUST_LOG=info cargo run --example reqid_example`, then
//! `curl -i -H 'request-id: upstream:42' localhost:3000/`

use axum::{error_handling::HandleErrorLayer, routing::get, Router};
use reqid::{get_host_details, handle_error, RequestId, ReqidConfig, ReqidLayer};
use tower::ServiceBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber - the request span carries the request_id field
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Use the host name and pid as prefix so ids are traceable to an instance
    let host = get_host_details();
    let config = ReqidConfig::new(format!("{}-{}", host.hostname, host.pid))
        .with_use_id_from_request(true);

    let app = Router::new()
        .route("/", get(handler))
        .route("/test", get(test_handler))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_error))
                .layer(ReqidLayer::new(config)?),
        );

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;

    tracing::info!("Starting server on 0.0.0.0:3000");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handler(request_id: RequestId) -> String {
    // These logs display request_id because the layer sets it on the span
    tracing::info!("Handling request");
    format!("Hello! Your request ID is: {request_id}")
}

async fn test_handler() -> &'static str {
    tracing::info!("Test handler called");
    "This is a test"
}
