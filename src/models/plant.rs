//! Plant record and the request bodies that create or edit one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A houseplant with its watering schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,
    pub name: String,
    /// `None` means the plant has never been watered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_watered_date: Option<DateTime<Utc>>,
    /// Local file reference or URL of the plant's photo
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    /// Watering interval in days
    pub frequency: u32,
}

impl Plant {
    /// Check the invariants every persisted record must satisfy.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.id.trim().is_empty() {
            return Err(AppError::InvalidArgument("Plant id is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "Plant name is required".to_string(),
            ));
        }
        if self.name.trim() != self.name {
            return Err(AppError::InvalidArgument(
                "Plant name must be trimmed".to_string(),
            ));
        }
        validate_frequency(self.frequency)
    }
}

fn validate_frequency(frequency: u32) -> Result<(), AppError> {
    if frequency == 0 {
        return Err(AppError::InvalidArgument(
            "Watering frequency must be a positive number of days".to_string(),
        ));
    }
    Ok(())
}

/// Request body for creating a new plant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlant {
    pub name: String,
    pub frequency: i64,
    #[serde(default, alias = "imageUrl")]
    pub image_uri: Option<String>,
}

impl NewPlant {
    /// Validate the input and mint a never-watered plant with a fresh id.
    pub fn into_plant(self) -> Result<Plant, AppError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::InvalidArgument(
                "Plant name is required".to_string(),
            ));
        }
        let frequency = parse_frequency(self.frequency)?;

        Ok(Plant {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            last_watered_date: None,
            image_uri: self.image_uri.filter(|uri| !uri.is_empty()),
            frequency,
        })
    }
}

/// Request body for editing an existing plant. Absent fields are left as is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlantRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub frequency: Option<i64>,
    #[serde(default, alias = "imageUrl")]
    pub image_uri: Option<String>,
}

impl UpdatePlantRequest {
    /// Produce the full replacement record for `existing`.
    pub fn apply_to(&self, existing: &Plant) -> Result<Plant, AppError> {
        let mut plant = existing.clone();

        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::InvalidArgument(
                    "Plant name is required".to_string(),
                ));
            }
            plant.name = name.to_string();
        }
        if let Some(frequency) = self.frequency {
            plant.frequency = parse_frequency(frequency)?;
        }
        if let Some(uri) = &self.image_uri {
            // An empty string clears the photo
            plant.image_uri = if uri.is_empty() {
                None
            } else {
                Some(uri.clone())
            };
        }

        Ok(plant)
    }
}

fn parse_frequency(frequency: i64) -> Result<u32, AppError> {
    let days = u32::try_from(frequency).map_err(|_| {
        AppError::InvalidArgument(
            "Watering frequency must be a positive number of days".to_string(),
        )
    })?;
    validate_frequency(days)?;
    Ok(days)
}
