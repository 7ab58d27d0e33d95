use std::fs;
use std::path::{Path, PathBuf};

use tomato_demand::artifacts::{CATEGORICAL_ENCODERS_FILE, METADATA_FILE, MODEL_FILE, TARGET_ENCODER_FILE};

pub const ARTIFACT_FILES: [&str; 4] = [MODEL_FILE, CATEGORICAL_ENCODERS_FILE, TARGET_ENCODER_FILE, METADATA_FILE];

pub fn fixture_models_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/models")
}

/// Fresh temp dir holding a copy of the fixture bundle.
pub fn models_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_artifacts(dir.path());
    dir
}

pub fn write_artifacts(dir: &Path) {
    for name in ARTIFACT_FILES {
        fs::copy(fixture_models_dir().join(name), dir.join(name)).expect("copy fixture");
    }
}
