//! Fixtures shared by the unit tests.

use std::fs;
use std::path::{Path, PathBuf};

use crate::artifacts::{CATEGORICAL_ENCODERS_FILE, METADATA_FILE, MODEL_FILE, TARGET_ENCODER_FILE};

pub fn fixture_models_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/models")
}

/// Copy the fixture artifact bundle into `dir`.
pub fn write_artifacts(dir: &Path) {
    let src = fixture_models_dir();
    for name in [MODEL_FILE, CATEGORICAL_ENCODERS_FILE, TARGET_ENCODER_FILE, METADATA_FILE] {
        fs::copy(src.join(name), dir.join(name)).unwrap();
    }
}
