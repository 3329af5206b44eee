use super::RecordStore;
use crate::errors::AppError;
use crate::models::Plant;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

/// In-memory record store with switchable failures and call counters.
#[derive(Default)]
pub struct FakeRecordStore {
    pub rows: Mutex<HashMap<String, Plant>>,
    pub initialized: AtomicBool,
    pub list_calls: AtomicU64,
    pub touched: Mutex<Vec<(String, DateTime<Utc>)>>,
    pub fail_initialize: AtomicBool,
    pub fail_list: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FakeRecordStore {
    pub fn failing_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn seed(&self, plant: Plant) {
        self.rows.lock().await.insert(plant.id.clone(), plant);
    }

    fn check_ready(&self) -> Result<(), AppError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(AppError::UninitializedStore);
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), AppError> {
        self.check_ready()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Storage("disk full".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn initialize(&self) -> Result<(), AppError> {
        if self.fail_initialize.load(Ordering::SeqCst) {
            return Err(AppError::Storage("permission denied".to_string()));
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Plant>, AppError> {
        self.check_ready()?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(AppError::Storage("corrupt table".to_string()));
        }
        Ok(self.rows.lock().await.values().cloned().collect())
    }

    async fn insert(&self, plant: &Plant) -> Result<(), AppError> {
        self.check_write()?;
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&plant.id) {
            return Err(AppError::DuplicateKey(plant.id.clone()));
        }
        rows.insert(plant.id.clone(), plant.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.check_write()?;
        self.rows.lock().await.remove(id);
        Ok(())
    }

    async fn touch_watered(&self, id: &str, watered_at: DateTime<Utc>) -> Result<(), AppError> {
        self.check_write()?;
        let mut rows = self.rows.lock().await;
        let plant = rows
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        plant.last_watered_date = Some(watered_at);
        self.touched.lock().await.push((id.to_string(), watered_at));
        Ok(())
    }

    async fn update(&self, plant: &Plant) -> Result<(), AppError> {
        self.check_write()?;
        let mut rows = self.rows.lock().await;
        let existing = rows
            .get_mut(&plant.id)
            .ok_or_else(|| AppError::NotFound(plant.id.clone()))?;
        *existing = plant.clone();
        Ok(())
    }
}
