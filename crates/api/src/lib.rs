//! HTTP API serving order reads.
//!
//! Exposes one endpoint per fetch strategy, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use entity_store::EntityStore;
use metrics_exporter_prometheus::PrometheusHandle;
use order_query::OrderQueryService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EntityStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/api/v1/simple-orders", get(routes::orders::v1::<S>))
        .route("/api/v2/simple-orders", get(routes::orders::v2::<S>))
        .route("/api/v3/simple-orders", get(routes::orders::v3::<S>))
        .route("/api/v4/simple-orders", get(routes::orders::v4::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over an entity store.
pub fn create_state<S: EntityStore>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        query_service: OrderQueryService::new(store),
    })
}
