//! Liveness endpoint for external uptime monitors.
//!
//! Serves a single `GET /` on its own OS thread with a dedicated runtime, so a
//! busy gateway loop never delays a health check. Shares no state with the bot.

use axum::{routing::get, Router};
use log::{error, info};
use std::net::SocketAddr;
use std::thread::JoinHandle;

/// Body returned to the monitor
pub const ALIVE_MESSAGE: &str = "I'm alive! The moderation bot is running.";

async fn alive() -> &'static str {
    ALIVE_MESSAGE
}

/// Router with the single liveness route
pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

/// Serve the liveness route on `0.0.0.0:port` until the process exits
pub async fn serve(port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind keep-alive server on {}: {}", addr, e);
            return;
        }
    };

    info!("Keep-alive server listening on {}", addr);
    if let Err(e) = axum::serve(listener, router()).await {
        error!("Keep-alive server error: {}", e);
    }
}

/// Start the liveness server on a background thread
pub fn spawn(port: u16) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("keep-alive".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start keep-alive runtime: {}", e);
                    return;
                }
            };
            runtime.block_on(serve(port));
        })
}
