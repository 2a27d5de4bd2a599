// SPDX-License-Identifier: MIT
//! SKEIN's HTTP surface: a single JSON service port exposing roster, sites,
//! folios, threads, logs, search, activity, screenshots, yields, naming, and
//! shard endpoints.

pub mod extract;
pub mod middleware;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::AppContext;

pub async fn start_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.host, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;
    let router = build_router(ctx);

    info!(%addr, "skein listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([middleware::REQUEST_ID_HEADER.clone()]);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/roster/register", post(routes::roster::register))
        .route("/roster", get(routes::roster::list))
        .route("/roster/{id}", get(routes::roster::get))
        .route("/roster/{id}", patch(routes::roster::patch))
        .route("/sites", post(routes::sites::create))
        .route("/sites", get(routes::sites::list))
        .route("/sites/{id}", get(routes::sites::get))
        .route("/sites/{id}/folios", get(routes::sites::folios))
        .route("/sites/{id}/folios", post(routes::sites::create_folio))
        .route("/folios", post(routes::folios::create))
        .route("/folios", get(routes::folios::list))
        .route("/folios/search", get(routes::folios::search_legacy))
        .route("/folios/{id}", get(routes::folios::get))
        .route("/folios/{id}", patch(routes::folios::patch))
        .route("/threads", post(routes::threads::create))
        .route("/threads", get(routes::threads::list))
        .route("/inbox", get(routes::threads::inbox))
        .route("/threads/{id}/read", patch(routes::threads::mark_read))
        .route("/logs", post(routes::logs::add))
        .route("/logs/streams", get(routes::logs::streams))
        .route("/logs/{stream}", get(routes::logs::get))
        .route("/search", get(routes::search::search))
        .route("/activity", get(routes::activity::activity))
        .route("/screenshots", post(routes::screenshots::add))
        .route("/screenshots", get(routes::screenshots::list))
        .route("/screenshots/{id}", get(routes::screenshots::get))
        .route("/screenshots/{id}/metadata", get(routes::screenshots::metadata))
        .route("/yields", post(routes::yields::add))
        .route("/yields/chain/{chain_id}", get(routes::yields::chain))
        .route("/yields/{sack_id}", get(routes::yields::get))
        .route("/yields/status/{status}", get(routes::yields::by_status))
        .route("/yields/agent/{agent_id}", get(routes::yields::by_agent))
        .route("/naming/generate", post(routes::naming::generate))
        .route("/shards", post(routes::shards::spawn))
        .route("/shards", get(routes::shards::list))
        .route("/shards/review-queue", get(routes::shards::review_queue))
        .route("/shards/{name}", get(routes::shards::status))
        .route("/shards/{name}", delete(routes::shards::cleanup))
        .route("/shards/{name}/diff", get(routes::shards::diff))
        .route("/shards/{name}/drift", get(routes::shards::drift))
        .route("/shards/{name}/merge", post(routes::shards::merge))
        .route("/shards/{name}/graft", post(routes::shards::graft))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(cors)
        .with_state(ctx)
}
