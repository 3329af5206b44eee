//! Container lifecycle endpoints.

use axum::extract::State;
use serde::Serialize;

use super::{success, ApiResult};
use crate::store::{LoadPhase, PlantsSnapshot};
use crate::AppState;

/// Lifecycle flags as seen by the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    #[serde(flatten)]
    pub phase: LoadPhase,
    pub is_initialized: bool,
    pub is_loading: bool,
    pub plant_count: usize,
}

impl From<&PlantsSnapshot> for StoreStatus {
    fn from(snapshot: &PlantsSnapshot) -> Self {
        Self {
            phase: snapshot.phase.clone(),
            is_initialized: snapshot.is_initialized(),
            is_loading: snapshot.is_loading(),
            plant_count: snapshot.plants.len(),
        }
    }
}

/// GET /api/state - Current lifecycle flags.
pub async fn get_state(State(state): State<AppState>) -> ApiResult<StoreStatus> {
    success(StoreStatus::from(&state.store.snapshot()))
}

/// POST /api/state/initialize - Load the store, or retry after a failure.
pub async fn initialize_store(State(state): State<AppState>) -> ApiResult<StoreStatus> {
    state.store.initialize_store().await?;
    success(StoreStatus::from(&state.store.snapshot()))
}
