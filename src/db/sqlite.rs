//! SQLite-backed record store.
//!
//! Uses parameterized statements; every write touches exactly one row in a
//! single statement, so SQLite's statement atomicity covers it.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tokio::sync::OnceCell;

use super::{checked_record, format_timestamp, parse_timestamp, RecordStore};
use crate::errors::AppError;
use crate::models::Plant;

/// Record store over a single `plants` table.
///
/// The connection pool is created by the first `initialize` call and lives
/// for the rest of the process.
pub struct SqliteRecordStore {
    db_path: PathBuf,
    pool: OnceCell<SqlitePool>,
}

impl SqliteRecordStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            pool: OnceCell::new(),
        }
    }

    fn pool(&self) -> Result<&SqlitePool, AppError> {
        self.pool.get().ok_or(AppError::UninitializedStore)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn initialize(&self) -> Result<(), AppError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = open_pool(&self.db_path).await?;
                run_migrations(&pool).await?;
                tracing::info!("SQLite plant store ready at {:?}", self.db_path);
                Ok::<_, AppError>(pool)
            })
            .await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Plant>, AppError> {
        let rows =
            sqlx::query("SELECT id, name, lastWateredDate, imageUri, frequency FROM plants")
                .fetch_all(self.pool()?)
                .await?;

        rows.iter().map(plant_from_row).collect()
    }

    async fn insert(&self, plant: &Plant) -> Result<(), AppError> {
        let last_watered = plant.last_watered_date.as_ref().map(format_timestamp);

        sqlx::query(
            "INSERT INTO plants (id, name, lastWateredDate, imageUri, frequency) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&plant.id)
        .bind(&plant.name)
        .bind(&last_watered)
        .bind(&plant.image_uri)
        .bind(i64::from(plant.frequency))
        .execute(self.pool()?)
        .await
        .map_err(|e| map_constraint_error(e, &plant.id))?;

        tracing::debug!("Inserted plant {}", plant.id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM plants WHERE id = ?")
            .bind(id)
            .execute(self.pool()?)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Delete of unknown plant {} ignored", id);
        }
        Ok(())
    }

    async fn touch_watered(&self, id: &str, watered_at: DateTime<Utc>) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE plants SET lastWateredDate = ? WHERE id = ?")
            .bind(format_timestamp(&watered_at))
            .bind(id)
            .execute(self.pool()?)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn update(&self, plant: &Plant) -> Result<(), AppError> {
        let last_watered = plant.last_watered_date.as_ref().map(format_timestamp);

        let result = sqlx::query(
            "UPDATE plants SET name = ?, lastWateredDate = ?, imageUri = ?, frequency = ? WHERE id = ?",
        )
        .bind(&plant.name)
        .bind(&last_watered)
        .bind(&plant.image_uri)
        .bind(i64::from(plant.frequency))
        .bind(&plant.id)
        .execute(self.pool()?)
        .await
        .map_err(|e| map_constraint_error(e, &plant.id))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(plant.id.clone()));
        }
        Ok(())
    }
}

/// Open the connection pool, creating the database file if needed.
async fn open_pool(db_path: &Path) -> Result<SqlitePool, AppError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            lastWateredDate TEXT,
            imageUri TEXT,
            frequency INTEGER NOT NULL CHECK (frequency > 0)
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn map_constraint_error(err: sqlx::Error, id: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::DuplicateKey(id.to_string());
        }
        if db_err.is_check_violation() {
            return AppError::InvalidArgument(format!("Plant {} violates a constraint", id));
        }
    }
    err.into()
}

fn plant_from_row(row: &SqliteRow) -> Result<Plant, AppError> {
    let last_watered: Option<String> = row.try_get("lastWateredDate")?;
    let frequency: i64 = row.try_get("frequency")?;

    checked_record(Plant {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        last_watered_date: last_watered.as_deref().map(parse_timestamp).transpose()?,
        image_uri: row.try_get("imageUri")?,
        frequency: u32::try_from(frequency)
            .map_err(|_| AppError::Storage(format!("Invalid stored frequency {}", frequency)))?,
    })
}
