//! # HTTP Routes
//!
//! ```text
//!   GET  /health                                  liveness + database check
//!   POST /api/v1/cart/summary                     PriceSummary for a cart
//!   POST /api/v1/checkout                         place an order
//!   GET  /api/v1/orders/{id}                      order with history
//!   POST /api/v1/orders/{id}/events               request a transition
//!   GET  /api/v1/customers/{customer_id}/orders   recent orders
//! ```
//!
//! Handlers only extract and respond; everything else lives in the service.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use emporium_core::{Order, PriceSummary};

use crate::error::{ApiError, ApiResult};
use crate::service::{CartRequest, CheckoutRequest, EventRequest};
use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/cart/summary", post(cart_summary))
        .route("/api/v1/checkout", post(checkout))
        .route("/api/v1/orders/{id}", get(get_order))
        .route("/api/v1/orders/{id}/events", post(post_event))
        .route("/api/v1/customers/{customer_id}/orders", get(customer_orders))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    database: bool,
}

/// Health check endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.storefront.db().health_check().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = Health {
        status: if database { "ok" } else { "degraded" },
        database,
    };
    (status, Json(body))
}

async fn cart_summary(
    State(state): State<AppState>,
    Json(request): Json<CartRequest>,
) -> ApiResult<Json<PriceSummary>> {
    Ok(Json(state.storefront.preview(&request).await?))
}

async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state.storefront.checkout(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    let id = parse_order_id(&id)?;
    Ok(Json(state.storefront.get_order(id).await?))
}

async fn post_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<EventRequest>,
) -> ApiResult<Json<Order>> {
    let id = parse_order_id(&id)?;
    Ok(Json(state.storefront.apply_event(id, request).await?))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<u32>,
}

async fn customer_orders(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Order>>> {
    let limit = params.limit.unwrap_or(20);
    Ok(Json(state.storefront.customer_orders(&customer_id, limit).await?))
}

fn parse_order_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("Invalid order id: {}", raw)))
}

// =============================================================================
// Unit Tests
// =============================================================================
