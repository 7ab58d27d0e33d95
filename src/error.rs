use std::path::PathBuf;
use thiserror::Error;

/// Failure to bring the artifact bundle into memory.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("model artifacts not found: {}", display_paths(.missing))]
    Missing { missing: Vec<PathBuf> },

    #[error("failed to load artifact {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("artifact {} is unusable: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

impl ArtifactError {
    pub fn load(path: &std::path::Path, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ArtifactError::Load {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }

    pub fn invalid(path: &std::path::Path, reason: impl Into<String>) -> Self {
        ArtifactError::Invalid {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("model not loaded")]
    Untrained,

    #[error("no categorical encoder named {0:?}")]
    MissingEncoder(String),

    #[error("unknown {encoder} value {value:?}")]
    UnknownCategory { encoder: String, value: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum PredictionError {
    #[error("model not loaded")]
    Untrained,

    #[error("feature encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("classifier failed: {0}")]
    Classifier(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON in {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read market data {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid market data JSON in {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid market week {week}/{year}: {reason}")]
    InvalidWeek { week: u32, year: i32, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_lists_every_path() {
        let err = ArtifactError::Missing {
            missing: vec![PathBuf::from("m/a.json"), PathBuf::from("m/b.json")],
        };
        assert_eq!(err.to_string(), "model artifacts not found: m/a.json, m/b.json");
    }

    #[test]
    fn load_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = ArtifactError::load(std::path::Path::new("m/rf_model.json"), io);
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn encoding_error_converts_into_prediction_error() {
        let err: PredictionError = EncodingError::UnknownCategory {
            encoder: "Month".into(),
            value: "Smarch".into(),
        }
        .into();
        assert_eq!(err.to_string(), "feature encoding failed: unknown Month value \"Smarch\"");
    }
}
