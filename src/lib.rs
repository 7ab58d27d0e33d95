//! Tomato market demand backend: artifact loading, feature encoding and
//! prediction, plus the dashboard views built on top of them.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod dashboard;
pub mod encoder;
pub mod error;
pub mod features;
pub mod forest;
pub mod ledger;
pub mod predictor;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::{build_router, AppState};
pub use artifacts::{ArtifactStore, ModelInfo};
pub use error::{ArtifactError, EncodingError, PredictionError};
pub use features::{FeatureVector, FEATURE_COLUMNS, FIXED_YEAR};
pub use predictor::{Prediction, Predictor};
pub use types::{DemandLevel, DiseaseAlert, MarketWeek, Observation, PredictionRecord};
