//! Application assembly: services, router, server.

pub mod server;
mod services;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use tubenote_core::Config;
use tubenote_infra::DiagnosticCapture;

use crate::api_doc::ApiDoc;
use crate::auth::{require_api_key, AuthState};
use crate::handlers;
use crate::state::AppState;

pub use services::initialize_services;

/// Initialize services and build the router, returning both so the caller
/// can keep a handle on the state.
pub async fn initialize_app(
    config: Config,
    capture: DiagnosticCapture,
) -> Result<(Arc<AppState>, Router)> {
    let state = Arc::new(initialize_services(&config, capture).await?);
    let router = build_router(state.clone());
    Ok((state, router))
}

/// Assemble the HTTP surface. Summarization and config routes sit behind the
/// master API key when one is configured.
pub fn build_router(state: Arc<AppState>) -> Router {
    let open = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );

    let mut protected = Router::new()
        .route("/summarize", post(handlers::summarize::summarize))
        .route("/summarize/async", post(handlers::summarize::summarize_async))
        .route("/config/reload", post(handlers::config::reload));

    match &state.config.master_api_key {
        Some(key) => {
            protected = protected.layer(middleware::from_fn_with_state(
                AuthState {
                    master_api_key: key.clone(),
                },
                require_api_key,
            ));
        }
        None => {
            tracing::warn!("TUBENOTE_API_KEY not set, summarization routes are unauthenticated");
        }
    }

    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .nest("/api/v0", open.merge(protected))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
