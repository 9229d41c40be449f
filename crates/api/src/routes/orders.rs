//! Order read endpoints, one per fetch strategy.
//!
//! None of them take query parameters; each runs with empty search criteria
//! and returns orders in primary-key order.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use entity_store::{EntityStore, Order};
use order_query::{OrderQueryService, OrderSearch, OrderSummary};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EntityStore> {
    pub query_service: OrderQueryService<S>,
}

/// GET /api/v1/simple-orders: entities with member and delivery loaded per
/// order (1 + 2N queries).
#[tracing::instrument(skip(state))]
pub async fn v1<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state.query_service.orders_v1(&OrderSearch::new()).await?;
    Ok(Json(orders))
}

/// GET /api/v2/simple-orders: entities mapped to summaries (1 + 2N queries).
#[tracing::instrument(skip(state))]
pub async fn v2<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let summaries = state.query_service.orders_v2(&OrderSearch::new()).await?;
    Ok(Json(summaries))
}

/// GET /api/v3/simple-orders: fetch join mapped to summaries (1 query).
#[tracing::instrument(skip(state))]
pub async fn v3<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let summaries = state.query_service.orders_v3(&OrderSearch::new()).await?;
    Ok(Json(summaries))
}

/// GET /api/v4/simple-orders: summaries selected directly (1 query).
#[tracing::instrument(skip(state))]
pub async fn v4<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let summaries = state.query_service.orders_v4(&OrderSearch::new()).await?;
    Ok(Json(summaries))
}
