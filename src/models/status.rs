//! Watering urgency derived from a plant and the current time.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Plant;

/// How urgently a plant needs water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WateringStatus {
    Late,
    Soon,
    Ok,
}

/// Classify a plant at `now`.
///
/// Never-watered plants are always late. Otherwise the whole days elapsed
/// since the last watering are compared with the frequency: at or past it is
/// late, within two days of it is soon. With a frequency of one or two days
/// the soon window starts immediately after watering.
pub fn classify(plant: &Plant, now: DateTime<Utc>) -> WateringStatus {
    let Some(last) = plant.last_watered_date else {
        return WateringStatus::Late;
    };

    // Floor, not truncation: a timestamp ahead of `now` counts as negative days
    let elapsed_days = (now - last).num_seconds().div_euclid(86_400);
    let frequency = i64::from(plant.frequency);

    if elapsed_days >= frequency {
        WateringStatus::Late
    } else if elapsed_days >= frequency - 2 {
        WateringStatus::Soon
    } else {
        WateringStatus::Ok
    }
}

/// A plant together with its status at the time of the read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantView {
    #[serde(flatten)]
    pub plant: Plant,
    pub status: WateringStatus,
}

impl PlantView {
    pub fn new(plant: &Plant, now: DateTime<Utc>) -> Self {
        Self {
            plant: plant.clone(),
            status: classify(plant, now),
        }
    }
}

/// Plants grouped into display sections.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusGroups {
    pub late: Vec<Plant>,
    pub soon: Vec<Plant>,
    pub ok: Vec<Plant>,
}

/// Split plants into late/soon/ok sections, each ordered by name.
pub fn group_by_status(plants: &[Plant], now: DateTime<Utc>) -> StatusGroups {
    let mut groups = StatusGroups::default();
    for plant in plants {
        let section = match classify(plant, now) {
            WateringStatus::Late => &mut groups.late,
            WateringStatus::Soon => &mut groups.soon,
            WateringStatus::Ok => &mut groups.ok,
        };
        section.push(plant.clone());
    }

    for section in [&mut groups.late, &mut groups.soon, &mut groups.ok] {
        section.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    }
    groups
}
