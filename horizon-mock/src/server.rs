/// Axum HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::ledger::MockLedger;

pub fn create_router(ledger: Arc<MockLedger>) -> Router {
    // Configure CORS to allow requests from wallet frontends/tests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Account endpoints
        .route("/accounts/:account_id", get(get_account))

        // Transaction endpoints
        .route("/transactions", post(submit_transaction))

        // Shared state
        .with_state(ledger)

        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(
    ledger: Arc<MockLedger>,
    host: String,
    port: u16,
) -> anyhow::Result<()> {
    let app = create_router(ledger);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("Horizon mock server listening on http://{}", addr);

    axum::serve(listener, app)
        .await?;

    Ok(())
}

/// Serve on an ephemeral localhost port from a dedicated thread
///
/// Returns once the socket is bound, so blocking clients can connect
/// immediately. The server lives until the process exits.
pub fn spawn_background(ledger: Arc<MockLedger>) -> anyhow::Result<SocketAddr> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;

    std::thread::Builder::new()
        .name("horizon-mock".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    log::error!("Failed to start mock runtime: {}", e);
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(e) => {
                        log::error!("Failed to adopt listener: {}", e);
                        return;
                    }
                };
                if let Err(e) = axum::serve(listener, create_router(ledger)).await {
                    log::error!("Horizon mock server error: {}", e);
                }
            });
        })?;

    log::info!("Horizon mock server listening on http://{}", addr);
    Ok(addr)
}
