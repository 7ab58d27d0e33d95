//! Artifact store: owns the on-disk model bundle and publishes it as one
//! immutable value.
//!
//! The bundle is either fully published or absent. Loading happens off to the
//! side and the result replaces the published value in a single assignment,
//! so readers holding an `Arc<ArtifactBundle>` never see a mix of old and new
//! artifacts.

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::encoder::{CategoricalEncoders, LabelEncoder, LAST_WEEK_DEMAND, MONTH};
use crate::error::ArtifactError;
use crate::features::FEATURE_COLUMNS;
use crate::forest::Forest;

pub const MODEL_FILE: &str = "rf_model.json";
pub const CATEGORICAL_ENCODERS_FILE: &str = "categorical_encoders.json";
pub const TARGET_ENCODER_FILE: &str = "target_encoder.json";
pub const METADATA_FILE: &str = "metadata.json";

const DEFAULT_MODEL_TYPE: &str = "Random Forest Classifier";
const DEFAULT_TARGET: &str = "Market_Demand";

/// Locations of the four artifact files inside one models directory.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub categorical_encoders: PathBuf,
    pub target_encoder: PathBuf,
    pub metadata: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            categorical_encoders: dir.join(CATEGORICAL_ENCODERS_FILE),
            target_encoder: dir.join(TARGET_ENCODER_FILE),
            metadata: dir.join(METADATA_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [
            &self.model,
            &self.categorical_encoders,
            &self.target_encoder,
            &self.metadata,
        ]
    }

    fn missing(&self) -> Vec<PathBuf> {
        self.all()
            .into_iter()
            .filter(|p| !p.exists())
            .map(Path::to_path_buf)
            .collect()
    }
}

/// Training metadata written next to the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default = "unknown_date")]
    pub training_date: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub model_type: Option<String>,
}

fn unknown_date() -> String {
    "Unknown".to_string()
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

/// Everything needed to serve a prediction, loaded together.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub forest: Forest,
    pub categorical: CategoricalEncoders,
    pub target: LabelEncoder,
    pub metadata: Metadata,
}

impl ArtifactBundle {
    /// Read and validate all four files. Nothing is published here.
    pub fn read(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let missing = paths.missing();
        if !missing.is_empty() {
            return Err(ArtifactError::Missing { missing });
        }

        let forest: Forest = read_json(&paths.model)?;
        let categorical: CategoricalEncoders = read_json(&paths.categorical_encoders)?;
        let target: LabelEncoder = read_json(&paths.target_encoder)?;
        let metadata: Metadata = read_json(&paths.metadata)?;

        let bundle = Self {
            forest,
            categorical,
            target,
            metadata,
        };
        bundle.validate(paths)?;
        Ok(bundle)
    }

    fn validate(&self, paths: &ArtifactPaths) -> Result<(), ArtifactError> {
        self.forest
            .validate()
            .map_err(|reason| ArtifactError::invalid(&paths.model, reason))?;
        if self.forest.n_features != FEATURE_COLUMNS.len() {
            return Err(ArtifactError::invalid(
                &paths.model,
                format!(
                    "classifier expects {} features, encoder produces {}",
                    self.forest.n_features,
                    FEATURE_COLUMNS.len()
                ),
            ));
        }
        if let Some(class) = self.forest.classes.iter().find(|c| self.target.label(**c).is_none()) {
            return Err(ArtifactError::invalid(
                &paths.target_encoder,
                format!("no label for classifier class {class}"),
            ));
        }
        if self.target.has_duplicates() {
            return Err(ArtifactError::invalid(&paths.target_encoder, "duplicate labels"));
        }

        for name in [LAST_WEEK_DEMAND, MONTH] {
            match self.categorical.get(name) {
                Some(enc) if !enc.has_duplicates() => {}
                Some(_) => {
                    return Err(ArtifactError::invalid(
                        &paths.categorical_encoders,
                        format!("encoder {name} has duplicate labels"),
                    ))
                }
                None => {
                    return Err(ArtifactError::invalid(
                        &paths.categorical_encoders,
                        format!("missing encoder {name}"),
                    ))
                }
            }
        }

        let features = &self.metadata.features;
        if !features.is_empty() && !features.iter().map(String::as_str).eq(FEATURE_COLUMNS) {
            return Err(ArtifactError::invalid(
                &paths.metadata,
                format!("feature columns {features:?} do not match {FEATURE_COLUMNS:?}"),
            ));
        }
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let text = fs::read_to_string(path).map_err(|e| ArtifactError::load(path, e))?;
    serde_json::from_str(&text).map_err(|e| ArtifactError::load(path, e))
}

/// Model description for callers and the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub is_trained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ModelInfo {
    pub fn untrained() -> Self {
        Self {
            is_trained: false,
            message: Some("Model not loaded.".to_string()),
            model_type: None,
            accuracy: None,
            training_date: None,
            features: None,
            target: None,
        }
    }

    fn from_bundle(bundle: &ArtifactBundle) -> Self {
        let meta = &bundle.metadata;
        Self {
            is_trained: true,
            message: None,
            model_type: Some(
                meta.model_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MODEL_TYPE.to_string()),
            ),
            accuracy: Some(meta.accuracy),
            training_date: Some(meta.training_date.clone()),
            features: Some(meta.features.clone()),
            target: Some(meta.target.clone()),
        }
    }
}

pub struct ArtifactStore {
    paths: ArtifactPaths,
    current: RwLock<Option<Arc<ArtifactBundle>>>,
    reload_guard: Mutex<()>,
}

impl ArtifactStore {
    /// A store that has not attempted a load yet.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            paths: ArtifactPaths::in_dir(dir),
            current: RwLock::new(None),
            reload_guard: Mutex::new(()),
        }
    }

    /// Construct and immediately attempt a load. A failed load is logged and
    /// leaves the store untrained; callers check `is_trained`.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let store = Self::new(dir);
        // failure is visible through is_trained()/info()
        let _ = store.load();
        store
    }

    /// Read all four artifacts and publish them. On any failure the store is
    /// left untrained.
    pub fn load(&self) -> Result<(), ArtifactError> {
        let _guard = self.reload_guard.lock();
        self.load_locked()
    }

    /// Re-read all four files and replace the held bundle. Readers keep the
    /// old bundle until the new one is published; a failure leaves the store
    /// untrained until the next successful load.
    pub fn reload(&self) -> Result<(), ArtifactError> {
        let _guard = self.reload_guard.lock();
        info!("reloading model from {}", self.paths.model.display());
        self.load_locked()
    }

    fn load_locked(&self) -> Result<(), ArtifactError> {
        match ArtifactBundle::read(&self.paths) {
            Ok(bundle) => {
                info!(
                    "model loaded: accuracy={:.3} training_date={} trees={}",
                    bundle.metadata.accuracy,
                    bundle.metadata.training_date,
                    bundle.forest.trees.len()
                );
                *self.current.write() = Some(Arc::new(bundle));
                Ok(())
            }
            Err(e) => {
                *self.current.write() = None;
                match &e {
                    ArtifactError::Missing { .. } => warn!("{e}"),
                    _ => error!("{e}: {}", source_chain(&e)),
                }
                Err(e)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn reload_lock(&self) -> parking_lot::MutexGuard<'_, ()> {
        self.reload_guard.lock()
    }

    pub fn is_trained(&self) -> bool {
        self.current.read().is_some()
    }

    /// Snapshot of the published bundle.
    pub fn bundle(&self) -> Option<Arc<ArtifactBundle>> {
        self.current.read().clone()
    }

    pub fn info(&self) -> ModelInfo {
        match self.bundle() {
            Some(bundle) => ModelInfo::from_bundle(&bundle),
            None => ModelInfo::untrained(),
        }
    }
}

fn source_chain(e: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut cur = e.source();
    while let Some(s) = cur {
        parts.push(s.to_string());
        cur = s.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_artifacts;

    #[test]
    fn loads_complete_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());
        let store = ArtifactStore::new(dir.path());
        assert!(!store.is_trained());
        store.load().unwrap();
        assert!(store.is_trained());

        let info = store.info();
        assert!(info.is_trained);
        assert_eq!(info.model_type.as_deref(), Some("Random Forest Classifier"));
        assert_eq!(info.accuracy, Some(0.95));
        assert_eq!(info.target.as_deref(), Some("Market_Demand"));
    }

    #[test]
    fn each_missing_file_leaves_store_untrained() {
        for name in [MODEL_FILE, CATEGORICAL_ENCODERS_FILE, TARGET_ENCODER_FILE, METADATA_FILE] {
            let dir = tempfile::tempdir().unwrap();
            write_artifacts(dir.path());
            fs::remove_file(dir.path().join(name)).unwrap();

            let store = ArtifactStore::open(dir.path());
            assert!(!store.is_trained(), "{name} removed but store trained");
            assert!(store.bundle().is_none());
            match store.load() {
                Err(ArtifactError::Missing { missing }) => {
                    assert_eq!(missing, vec![dir.path().join(name)]);
                }
                other => panic!("expected Missing, got {other:?}"),
            }
        }
    }

    #[test]
    fn corrupt_file_keeps_source_error() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());
        fs::write(dir.path().join(TARGET_ENCODER_FILE), "{not json").unwrap();

        let store = ArtifactStore::new(dir.path());
        let err = store.load().unwrap_err();
        match &err {
            ArtifactError::Load { path, .. } => assert!(path.ends_with(TARGET_ENCODER_FILE)),
            other => panic!("expected Load, got {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
        assert!(!store.is_trained());
    }

    #[test]
    fn reordered_feature_columns_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());
        fs::write(
            dir.path().join(METADATA_FILE),
            r#"{"accuracy": 0.9, "training_date": "2025-01-01",
                "features": ["Temperature_C", "Rainfall_mm", "Market_Day", "School_Open",
                             "Disease_Alert", "Last_Week_Demand", "Month", "Year"],
                "target": "Market_Demand"}"#,
        )
        .unwrap();

        let store = ArtifactStore::new(dir.path());
        assert!(matches!(store.load(), Err(ArtifactError::Invalid { .. })));
        assert!(!store.is_trained());
    }

    #[test]
    fn missing_month_encoder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());
        fs::write(
            dir.path().join(CATEGORICAL_ENCODERS_FILE),
            r#"{"Last_Week_Demand": {"classes": ["Low", "Medium", "High"]}}"#,
        )
        .unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("missing encoder Month"), "{err}");
    }

    fn load_with_replaced(name: &str, contents: &str) -> (ArtifactStore, ArtifactError) {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());
        fs::write(dir.path().join(name), contents).unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.load().unwrap_err();
        (store, err)
    }

    #[test]
    fn wrong_feature_count_is_rejected() {
        let forest = fs::read_to_string(crate::testing::fixture_models_dir().join(MODEL_FILE))
            .unwrap()
            .replace(r#""n_features": 8"#, r#""n_features": 9"#);
        let (store, err) = load_with_replaced(MODEL_FILE, &forest);
        match &err {
            ArtifactError::Invalid { path, reason } => {
                assert!(path.ends_with(MODEL_FILE));
                assert!(reason.contains("expects 9 features"), "{reason}");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(!store.is_trained());
    }

    #[test]
    fn classifier_class_without_label_is_rejected() {
        let forest = fs::read_to_string(crate::testing::fixture_models_dir().join(MODEL_FILE))
            .unwrap()
            .replace(r#""classes": [0, 1, 2]"#, r#""classes": [0, 1, 3]"#);
        let (store, err) = load_with_replaced(MODEL_FILE, &forest);
        match &err {
            ArtifactError::Invalid { path, reason } => {
                assert!(path.ends_with(TARGET_ENCODER_FILE));
                assert!(reason.contains("class 3"), "{reason}");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(!store.is_trained());
    }

    #[test]
    fn duplicate_target_labels_are_rejected() {
        let (store, err) = load_with_replaced(TARGET_ENCODER_FILE, r#"{"classes": ["High", "Low", "High"]}"#);
        match &err {
            ArtifactError::Invalid { path, reason } => {
                assert!(path.ends_with(TARGET_ENCODER_FILE));
                assert_eq!(reason, "duplicate labels");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(!store.is_trained());
    }

    #[test]
    fn duplicate_categorical_labels_are_rejected() {
        let encoders = r#"{
            "Last_Week_Demand": {"classes": ["Low", "Medium", "Low"]},
            "Month": {"classes": ["January", "February", "March", "April", "May", "June",
                                  "July", "August", "September", "October", "November", "December"]}
        }"#;
        let (store, err) = load_with_replaced(CATEGORICAL_ENCODERS_FILE, encoders);
        match &err {
            ArtifactError::Invalid { path, reason } => {
                assert!(path.ends_with(CATEGORICAL_ENCODERS_FILE));
                assert!(reason.contains("Last_Week_Demand has duplicate labels"), "{reason}");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(!store.is_trained());
    }

    #[test]
    fn failed_reload_unloads() {
        let dir = tempfile::tempdir().unwrap();
        write_artifacts(dir.path());
        let store = ArtifactStore::open(dir.path());
        assert!(store.is_trained());

        fs::remove_file(dir.path().join(MODEL_FILE)).unwrap();
        assert!(store.reload().is_err());
        assert!(!store.is_trained());
        assert_eq!(store.info(), ModelInfo::untrained());

        write_artifacts(dir.path());
        store.reload().unwrap();
        assert!(store.is_trained());
    }

    #[test]
    fn reload_before_any_load_is_safe() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.reload().is_err());
        write_artifacts(dir.path());
        assert!(store.reload().is_ok());
    }

    #[test]
    fn untrained_info_serializes_minimally() {
        let json = serde_json::to_value(ModelInfo::untrained()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"is_trained": false, "message": "Model not loaded."})
        );
    }
}
