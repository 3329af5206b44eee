//! Process-wide plant state container.
//!
//! Mirrors the record store in memory with write-through discipline: a
//! mutation reaches the in-memory collection only after the durable write
//! succeeded. State is published as whole immutable snapshots over a watch
//! channel, so observers never see a half-applied change.

mod clock;

#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::db::RecordStore;
use crate::errors::AppError;
use crate::models::{Plant, UpdatePlantRequest};

/// Loading lifecycle of the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum LoadPhase {
    Uninitialized,
    Initializing,
    Ready,
    /// The last initialization attempt failed; the collection is empty and
    /// `initialize_store` may be retried.
    InitializationFailed { message: String },
}

/// A consistent view of the container at one point in time.
#[derive(Debug, Clone)]
pub struct PlantsSnapshot {
    pub phase: LoadPhase,
    pub plants: Arc<Vec<Plant>>,
}

impl PlantsSnapshot {
    pub fn is_initialized(&self) -> bool {
        self.phase == LoadPhase::Ready
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Initializing
    }

    pub fn find(&self, id: &str) -> Option<&Plant> {
        self.plants.iter().find(|p| p.id == id)
    }
}

/// Write-through cache of all plant records.
pub struct PlantStore {
    records: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<PlantsSnapshot>,
    /// Serializes initialization and mutations so writes for one id reach
    /// storage in call order.
    write_lock: Mutex<()>,
}

impl PlantStore {
    pub fn new(records: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(PlantsSnapshot {
            phase: LoadPhase::Uninitialized,
            plants: Arc::new(Vec::new()),
        });

        Self {
            records,
            clock,
            state,
            write_lock: Mutex::new(()),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> PlantsSnapshot {
        self.state.borrow().clone()
    }

    /// Receive a notification for every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PlantsSnapshot> {
        self.state.subscribe()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn get_plant(&self, id: &str) -> Option<Plant> {
        self.state.borrow().find(id).cloned()
    }

    /// Open the record store and load every plant into memory.
    ///
    /// A no-op once the container is ready. On failure the container moves to
    /// `InitializationFailed` with an empty collection and the error is
    /// returned; calling again retries.
    pub async fn initialize_store(&self) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        if self.state.borrow().is_initialized() {
            return Ok(());
        }

        self.state.send_modify(|snapshot| snapshot.phase = LoadPhase::Initializing);

        match self.load().await {
            Ok(plants) => {
                tracing::info!("Plant store initialized with {} plants", plants.len());
                self.state.send_replace(PlantsSnapshot {
                    phase: LoadPhase::Ready,
                    plants: Arc::new(plants),
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to initialize plant store: {}", e);
                self.state.send_replace(PlantsSnapshot {
                    phase: LoadPhase::InitializationFailed {
                        message: e.message(),
                    },
                    plants: Arc::new(Vec::new()),
                });
                Err(e)
            }
        }
    }

    async fn load(&self) -> Result<Vec<Plant>, AppError> {
        self.records.initialize().await?;
        self.records.list_all().await
    }

    /// Persist a new plant, then append it to the collection.
    pub async fn add_plant(&self, plant: Plant) -> Result<Plant, AppError> {
        plant.validate()?;
        let _guard = self.write_lock.lock().await;
        self.ensure_ready()?;

        if let Err(e) = self.records.insert(&plant).await {
            tracing::warn!("Failed to add plant {}: {}", plant.id, e);
            return Err(e);
        }

        tracing::info!("Added plant {} ({})", plant.id, plant.name);
        let added = plant.clone();
        self.publish(move |plants| {
            let mut next = plants.to_vec();
            next.push(added);
            next
        });
        Ok(plant)
    }

    /// Delete a plant from storage, then from the collection. Unknown ids
    /// are ignored.
    pub async fn remove_plant(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_ready()?;

        if let Err(e) = self.records.delete(id).await {
            tracing::warn!("Failed to remove plant {}: {}", id, e);
            return Err(e);
        }

        if self.state.borrow().find(id).is_some() {
            tracing::info!("Removed plant {}", id);
            self.publish(|plants| plants.iter().filter(|p| p.id != id).cloned().collect());
        }
        Ok(())
    }

    /// Record a watering at the current time.
    ///
    /// The timestamp is read from the clock once and the same value goes to
    /// storage and to the cached record.
    pub async fn water_plant(&self, id: &str) -> Result<Plant, AppError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_ready()?;

        let now = self.clock.now();
        if let Err(e) = self.records.touch_watered(id, now).await {
            tracing::warn!("Failed to water plant {}: {}", id, e);
            return Err(e);
        }

        tracing::info!("Watered plant {}", id);
        self.publish(|plants| {
            plants
                .iter()
                .map(|p| {
                    if p.id == id {
                        Plant {
                            last_watered_date: Some(now),
                            ..p.clone()
                        }
                    } else {
                        p.clone()
                    }
                })
                .collect()
        });

        self.get_plant(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    /// Replace a plant's fields in storage, then in the collection.
    pub async fn update_plant(&self, plant: Plant) -> Result<Plant, AppError> {
        plant.validate()?;
        let _guard = self.write_lock.lock().await;
        self.ensure_ready()?;
        self.write_update(plant).await
    }

    /// Apply a partial edit to the current cached record and persist it.
    ///
    /// The lookup happens under the write lock, so a watering recorded just
    /// before the edit is carried into the replacement record.
    pub async fn edit_plant(
        &self,
        id: &str,
        request: &UpdatePlantRequest,
    ) -> Result<Plant, AppError> {
        let _guard = self.write_lock.lock().await;
        self.ensure_ready()?;

        let existing = self
            .get_plant(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        let plant = request.apply_to(&existing)?;
        plant.validate()?;
        self.write_update(plant).await
    }

    /// Caller must hold `write_lock`.
    async fn write_update(&self, plant: Plant) -> Result<Plant, AppError> {
        if let Err(e) = self.records.update(&plant).await {
            tracing::warn!("Failed to update plant {}: {}", plant.id, e);
            return Err(e);
        }

        tracing::info!("Updated plant {}", plant.id);
        let updated = plant.clone();
        self.publish(move |plants| {
            plants
                .iter()
                .map(|p| if p.id == updated.id { updated.clone() } else { p.clone() })
                .collect()
        });
        Ok(plant)
    }

    fn ensure_ready(&self) -> Result<(), AppError> {
        if self.state.borrow().is_initialized() {
            Ok(())
        } else {
            Err(AppError::UninitializedStore)
        }
    }

    /// Derive a new collection from the current one and publish it.
    fn publish<F>(&self, derive: F)
    where
        F: FnOnce(&[Plant]) -> Vec<Plant>,
    {
        self.state.send_modify(|snapshot| {
            snapshot.plants = Arc::new(derive(&snapshot.plants));
        });
    }
}
