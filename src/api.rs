// src/api.rs
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::ApiError;
use crate::store::{Punch, SharedStore};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/punches", get(list_punches))
        .route("/punch", post(create_punch))
        .route("/reset", post(reset))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// All punches, ascending by time.
async fn list_punches(State(state): State<AppState>) -> Result<Json<Vec<Punch>>, ApiError> {
    let mut punches = state.store.list_punches().await?;
    punches.sort_by_key(|p| p.epoch_millis);
    Ok(Json(punches))
}

/// Body `{isIn, epochMillis}`; replies with a one-element array of the stored punch.
/// Times chrono cannot represent are rejected before they reach the store.
async fn create_punch(
    State(state): State<AppState>,
    Json(body): Json<Punch>,
) -> Result<Json<Vec<Punch>>, ApiError> {
    if DateTime::<Utc>::from_timestamp_millis(body.epoch_millis).is_none() {
        return Err(ApiError::InvalidPunch(body.epoch_millis));
    }
    let punch = state.store.add_punch(body).await?;
    counter!("punches_recorded_total").increment(1);
    info!(target: "api", is_in = punch.is_in, epoch_millis = punch.epoch_millis, "PUNCH");
    Ok(Json(vec![punch]))
}

async fn reset(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    state.store.clear_punches().await.map_err(ApiError::Reset)?;
    info!(target: "api", "punches reset");
    Ok("ok")
}
