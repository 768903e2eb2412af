use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::courier::{Courier, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id/availability", patch(update_availability))
        .route("/couriers/:id/location", patch(update_location))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub location: GeoPoint,
    pub score: f64,
    #[serde(default = "default_approved")]
    pub approved: bool,
}

fn default_approved() -> bool {
    true
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub available: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, DispatchError> {
    if payload.name.trim().is_empty() {
        return Err(DispatchError::BadRequest("name cannot be empty".to_string()));
    }

    let courier = Courier {
        id: Uuid::new_v4(),
        name: payload.name,
        location: payload.location,
        available: true,
        approved: payload.approved,
        score: payload.score.clamp(0.0, 10.0),
        last_seen_at: Utc::now(),
    };

    state.directory.insert(courier.clone());
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    Json(state.directory.list())
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Courier>, DispatchError> {
    let courier = state
        .directory
        .update(id, |courier| courier.available = payload.available)
        .ok_or_else(|| DispatchError::NotFound(format!("courier {id} not found")))?;

    Ok(Json(courier))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, DispatchError> {
    let courier = state
        .directory
        .update(id, |courier| courier.location = payload.location.clone())
        .ok_or_else(|| DispatchError::NotFound(format!("courier {id} not found")))?;

    Ok(Json(courier))
}
