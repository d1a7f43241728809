use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::dispatch;
use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assignments", get(list_assignments))
        .route("/assignments/:id/accept", post(accept_assignment))
}

#[derive(Deserialize)]
pub struct AcceptRequest {
    pub courier_id: Uuid,
}

async fn list_assignments(State(state): State<Arc<AppState>>) -> Json<Vec<Assignment>> {
    Json(state.ledger.snapshot())
}

async fn accept_assignment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcceptRequest>,
) -> Result<Json<Assignment>, AppError> {
    let assignment = dispatch::accept_assignment(&state, id, payload.courier_id)?;
    Ok(Json(assignment))
}
