//! Read-only HTTP surface (spec §1 Non-goals: no user CRUD, no auth/JWT —
//! this exposes opportunity state for operators, nothing else).
//!
//! Grounded in cowprotocol-services' `orderbook` crate's `axum` wiring:
//! a thin `Router` with a shared state extension and `tower_http::trace`.

pub mod broadcast;
pub mod opportunities;

use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

pub fn build_router(db: Database) -> Router {
    let state = Arc::new(AppState { db });
    Router::new()
        .route("/healthz", get(healthz))
        .route("/opportunities", get(opportunities::list_opportunities))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

pub async fn serve(listen_addr: &str, db: Database, mut shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
    let router = build_router(db);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(listen_addr, "http surface listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;
    Ok(())
}
