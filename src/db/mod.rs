//! Durable record stores for plant data.
//!
//! Two backends implement [`RecordStore`]: a SQLite table and a JSON file
//! slot holding the whole collection. Neither keeps an in-memory cache; that
//! is the state container's job.

#[cfg(test)]
pub mod fake;
mod json;
mod sqlite;

pub use json::JsonRecordStore;
pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::Plant;

/// Durable CRUD for plant records.
///
/// `initialize` must complete before any other call; until then every other
/// operation fails with [`AppError::UninitializedStore`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open or create the underlying resource and ensure the schema exists.
    /// Calls after the first successful one are no-ops.
    async fn initialize(&self) -> Result<(), AppError>;

    /// All persisted records, in no particular order.
    async fn list_all(&self) -> Result<Vec<Plant>, AppError>;

    /// Persist a new record. Fails with `DuplicateKey` if the id exists.
    async fn insert(&self, plant: &Plant) -> Result<(), AppError>;

    /// Remove a record. Unknown ids are ignored.
    async fn delete(&self, id: &str) -> Result<(), AppError>;

    /// Set only the last-watered timestamp. Fails with `NotFound`.
    async fn touch_watered(&self, id: &str, watered_at: DateTime<Utc>) -> Result<(), AppError>;

    /// Replace every mutable field of the record. Fails with `NotFound`.
    async fn update(&self, plant: &Plant) -> Result<(), AppError>;
}

/// Normalize a record read back from storage.
///
/// Names are trimmed; records that still fail validation (blank name, zero
/// frequency) are reported as storage corruption.
pub(crate) fn checked_record(mut plant: Plant) -> Result<Plant, AppError> {
    plant.name = plant.name.trim().to_string();
    plant.validate().map_err(|e| {
        AppError::Storage(format!("Invalid stored plant {}: {}", plant.id, e.message()))
    })?;
    Ok(plant)
}

/// Format a timestamp for storage without losing sub-second precision.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

/// Parse a stored timestamp back into UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::Storage(format!("Invalid stored timestamp '{}': {}", raw, e)))
}
