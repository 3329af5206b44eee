//! JSON file-slot record store.
//!
//! The whole collection lives in one file as a JSON array. Mutations are
//! read-modify-write under a mutex and land via write-to-temp + rename, so a
//! reader sees either the old snapshot or the new one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{checked_record, RecordStore};
use crate::errors::AppError;
use crate::models::Plant;

pub struct JsonRecordStore {
    slot: PathBuf,
    /// Set once the slot exists and parses.
    initialized: Mutex<bool>,
}

impl JsonRecordStore {
    pub fn new(slot: impl Into<PathBuf>) -> Self {
        Self {
            slot: slot.into(),
            initialized: Mutex::new(false),
        }
    }

    /// Run `f` against the current collection and persist the result.
    async fn mutate<F>(&self, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Vec<Plant>) -> Result<bool, AppError> + Send,
    {
        let guard = self.initialized.lock().await;
        if !*guard {
            return Err(AppError::UninitializedStore);
        }

        let mut plants = read_slot(&self.slot).await?;
        if f(&mut plants)? {
            write_slot(&self.slot, &plants).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn initialize(&self) -> Result<(), AppError> {
        let mut guard = self.initialized.lock().await;
        if *guard {
            return Ok(());
        }

        if tokio::fs::try_exists(&self.slot).await? {
            // Refuse to start over a corrupt slot rather than overwrite it
            read_slot(&self.slot).await?;
        } else {
            if let Some(parent) = self.slot.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            write_slot(&self.slot, &[]).await?;
        }

        *guard = true;
        tracing::info!("JSON plant store ready at {:?}", self.slot);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Plant>, AppError> {
        let guard = self.initialized.lock().await;
        if !*guard {
            return Err(AppError::UninitializedStore);
        }
        read_slot(&self.slot).await
    }

    async fn insert(&self, plant: &Plant) -> Result<(), AppError> {
        self.mutate(|plants| {
            if plants.iter().any(|p| p.id == plant.id) {
                return Err(AppError::DuplicateKey(plant.id.clone()));
            }
            plants.push(plant.clone());
            Ok(true)
        })
        .await?;

        tracing::debug!("Inserted plant {}", plant.id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.mutate(|plants| {
            let before = plants.len();
            plants.retain(|p| p.id != id);
            Ok(plants.len() != before)
        })
        .await
    }

    async fn touch_watered(&self, id: &str, watered_at: DateTime<Utc>) -> Result<(), AppError> {
        self.mutate(|plants| {
            let plant = plants
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;
            plant.last_watered_date = Some(watered_at);
            Ok(true)
        })
        .await
    }

    async fn update(&self, plant: &Plant) -> Result<(), AppError> {
        self.mutate(|plants| {
            let existing = plants
                .iter_mut()
                .find(|p| p.id == plant.id)
                .ok_or_else(|| AppError::NotFound(plant.id.clone()))?;
            *existing = plant.clone();
            Ok(true)
        })
        .await
    }
}

async fn read_slot(slot: &Path) -> Result<Vec<Plant>, AppError> {
    let bytes = tokio::fs::read(slot).await?;
    let plants: Vec<Plant> = serde_json::from_slice(&bytes)?;
    plants.into_iter().map(checked_record).collect()
}

async fn write_slot(slot: &Path, plants: &[Plant]) -> Result<(), AppError> {
    let bytes = serde_json::to_vec_pretty(plants)?;
    let mut tmp = slot.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, slot).await?;
    Ok(())
}
