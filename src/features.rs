use serde::Serialize;

use crate::encoder::{CategoricalEncoders, LAST_WEEK_DEMAND, MONTH};
use crate::error::EncodingError;
use crate::types::{DiseaseAlert, Observation};

/// Column order the classifier was trained on. Reordering silently corrupts
/// predictions.
pub const FEATURE_COLUMNS: [&str; 8] = [
    "Rainfall_mm",
    "Temperature_C",
    "Market_Day",
    "School_Open",
    "Disease_Alert",
    "Last_Week_Demand",
    "Month",
    "Year",
];

/// Year fed to the classifier for every observation.
// NOTE: the observation's own year is deliberately not used; pending product
// confirmation on whether the model should see the real year.
pub const FIXED_YEAR: f64 = 2024.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; 8]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn values(&self) -> [f64; 8] {
        self.0
    }

    /// `(column, value)` pairs in column order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_COLUMNS.iter().copied().zip(self.0.iter().copied())
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

pub(crate) fn encode_with(
    encoders: &CategoricalEncoders,
    obs: &Observation,
) -> Result<FeatureVector, EncodingError> {
    let last_week = encoders.transform(LAST_WEEK_DEMAND, &obs.last_week_demand)?;
    let month = encoders.transform(MONTH, &obs.month)?;

    Ok(FeatureVector([
        obs.rainfall_mm,
        obs.temperature_c,
        flag(obs.market_day),
        flag(obs.school_open),
        // literal comparison, not an encoder lookup
        flag(obs.disease_alert == DiseaseAlert::Presence),
        last_week as f64,
        month as f64,
        FIXED_YEAR,
    ]))
}
