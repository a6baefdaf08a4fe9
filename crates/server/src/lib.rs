//! Shopfront HTTP surface: axum routes over a shared `Storefront`.

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::get,
    Router,
};
use shopfront_api::Storefront;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

pub mod auth;
pub mod error;
pub mod routes;

pub use auth::Caller;
pub use error::ApiError;

pub fn build_router(shop: Arc<Storefront>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/products", get(routes::list_products))
        .route("/api/products/:id", get(routes::product))
        .route(
            "/api/products/:id/reviews",
            axum::routing::post(routes::add_review).put(routes::edit_review).delete(routes::delete_review),
        )
        .route("/api/categories", get(routes::categories))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shop)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(addr: SocketAddr, shop: Arc<Storefront>) -> Result<()> {
    let app = build_router(shop);
    let listener = TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "shopfront listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("serving http")?;
    info!("shopfront stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "installing Ctrl+C handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "installing SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
