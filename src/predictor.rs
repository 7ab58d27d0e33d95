//! Prediction service over the artifact store.

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::artifacts::{ArtifactBundle, ArtifactStore, ModelInfo};
use crate::error::{ArtifactError, EncodingError, PredictionError};
use crate::features::{encode_with, FeatureVector};
use crate::types::Observation;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

/// Shared, process-wide predictor. Construct once and hand out by `Arc`.
pub struct Predictor {
    store: ArtifactStore,
}

impl Predictor {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Build a predictor for `models_dir` and attempt the initial load.
    pub fn open(models_dir: impl AsRef<Path>) -> Self {
        Self::new(ArtifactStore::open(models_dir))
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn is_trained(&self) -> bool {
        self.store.is_trained()
    }

    pub fn info(&self) -> ModelInfo {
        self.store.info()
    }

    pub fn reload(&self) -> Result<(), ArtifactError> {
        self.store.reload()
    }

    pub fn encode(&self, obs: &Observation) -> Result<FeatureVector, EncodingError> {
        let bundle = self.store.bundle().ok_or(EncodingError::Untrained)?;
        encode_with(&bundle.categorical, obs)
    }

    pub fn predict(&self, obs: &Observation) -> Result<Prediction, PredictionError> {
        let bundle = self.store.bundle().ok_or(PredictionError::Untrained)?;
        predict_with(&bundle, obs)
    }
}

// One bundle snapshot for encode + score + decode.
fn predict_with(bundle: &Arc<ArtifactBundle>, obs: &Observation) -> Result<Prediction, PredictionError> {
    let features = encode_with(&bundle.categorical, obs)?;
    debug!(
        "encoded week={} month={} features={:?}",
        obs.week,
        obs.month,
        features.values()
    );

    let (class, confidence) = bundle.forest.predict(features.as_slice())?;
    let label = bundle
        .target
        .label(class)
        .ok_or_else(|| PredictionError::Classifier(format!("no label for class {class}")))?;

    Ok(Prediction {
        label: label.to_string(),
        confidence,
    })
}
