use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::dispatch::{self, AssignmentOffer, CurrentDelivery};
use crate::error::AppError;
use crate::models::courier::{Courier, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_courier).get(list_couriers))
        .route("/couriers/:id/location", patch(update_courier_location))
        .route("/couriers/:id/assignments", get(list_assignment_offers))
        .route(
            "/couriers/:id/assignments/current",
            get(current_assignment),
        )
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub full_name: String,
    pub mobile: String,
    pub location: GeoPoint,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("full_name cannot be empty".to_string()));
    }

    if payload.mobile.trim().is_empty() {
        return Err(AppError::BadRequest("mobile cannot be empty".to_string()));
    }

    let courier = Courier {
        id: Uuid::new_v4(),
        full_name: payload.full_name,
        mobile: payload.mobile,
        location: payload.location,
        is_online: false,
        updated_at: Utc::now(),
    };

    state.directory.upsert(courier.clone());
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    Json(state.directory.snapshot())
}

async fn update_courier_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Courier>, AppError> {
    dispatch::handle_location_update(&state, id, payload.location)?;

    let courier = state
        .directory
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("courier {} not found", id)))?;

    Ok(Json(courier))
}

async fn list_assignment_offers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<Vec<AssignmentOffer>> {
    Json(dispatch::list_broadcasts_for(&state, id))
}

async fn current_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CurrentDelivery>, AppError> {
    Ok(Json(dispatch::current_assignment_for(&state, id)?))
}
