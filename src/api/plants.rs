//! Plant API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{group_by_status, NewPlant, PlantView, StatusGroups, UpdatePlantRequest};
use crate::AppState;

/// GET /api/plants - List all plants with their watering status.
pub async fn list_plants(State(state): State<AppState>) -> ApiResult<Vec<PlantView>> {
    let snapshot = state.store.snapshot();
    let now = state.store.now();

    success(
        snapshot
            .plants
            .iter()
            .map(|plant| PlantView::new(plant, now))
            .collect(),
    )
}

/// GET /api/plants/grouped - Plants split into late/soon/ok sections.
pub async fn grouped_plants(State(state): State<AppState>) -> ApiResult<StatusGroups> {
    let snapshot = state.store.snapshot();
    success(group_by_status(&snapshot.plants, state.store.now()))
}

/// GET /api/plants/:id - Get a single plant.
pub async fn get_plant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PlantView> {
    match state.store.get_plant(&id) {
        Some(plant) => success(PlantView::new(&plant, state.store.now())),
        None => Err(AppError::NotFound(id)),
    }
}

/// POST /api/plants - Create a new plant.
pub async fn create_plant(
    State(state): State<AppState>,
    Json(request): Json<NewPlant>,
) -> ApiResult<PlantView> {
    let plant = state.store.add_plant(request.into_plant()?).await?;
    success(PlantView::new(&plant, state.store.now()))
}

/// PUT /api/plants/:id - Edit name, frequency or photo.
pub async fn update_plant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePlantRequest>,
) -> ApiResult<PlantView> {
    let plant = state.store.edit_plant(&id, &request).await?;
    success(PlantView::new(&plant, state.store.now()))
}

/// POST /api/plants/:id/water - Mark a plant as watered now.
pub async fn water_plant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PlantView> {
    let plant = state.store.water_plant(&id).await?;
    success(PlantView::new(&plant, state.store.now()))
}

/// DELETE /api/plants/:id - Delete a plant. Deleting an unknown id succeeds.
pub async fn delete_plant(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.store.remove_plant(&id).await?;
    success(())
}
