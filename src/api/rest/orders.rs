use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::queue::enqueue_order;
use crate::error::DispatchError;
use crate::models::courier::GeoPoint;
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/decision", post(post_decision))
        .route("/orders/:id/arrived", post(post_arrived))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub destination: GeoPoint,
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub courier_id: Uuid,
    pub accepted: bool,
}

#[derive(Serialize)]
pub struct DecisionResponse {
    pub resolved: bool,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, DispatchError> {
    let order = Order::new(payload.destination);

    state.orders.insert(order.clone());
    enqueue_order(&state, &order).await?;

    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, DispatchError> {
    let order = state
        .orders
        .get_cloned(id)
        .ok_or_else(|| DispatchError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}

/// REST fallback for the decision signal; courier devices normally push it
/// over the websocket.
async fn post_decision(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionRequest>,
) -> Json<DecisionResponse> {
    let resolved = state
        .engine
        .on_decision(id, payload.courier_id, payload.accepted);

    Json(DecisionResponse { resolved })
}

async fn post_arrived(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, DispatchError> {
    state.engine.on_arrival_confirmed(id).await?;

    let order = state
        .orders
        .get_cloned(id)
        .ok_or_else(|| DispatchError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}
