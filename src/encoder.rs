//! Label encoders exported by the offline trainer.
//!
//! An encoder is an ordered vocabulary: a label's code is its position in
//! `classes`. This matches how the trainer writes out its fitted encoders, so
//! the order in the file is significant and must never be re-sorted here.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::EncodingError;

/// Key of the last-week-demand encoder in `categorical_encoders.json`.
pub const LAST_WEEK_DEMAND: &str = "Last_Week_Demand";
/// Key of the month encoder in `categorical_encoders.json`.
pub const MONTH: &str = "Month";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn code(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    pub fn label(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    pub fn has_duplicates(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        !self.classes.iter().all(|c| seen.insert(c))
    }
}

/// The named set of input-feature encoders.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CategoricalEncoders(HashMap<String, LabelEncoder>);

impl CategoricalEncoders {
    pub fn get(&self, name: &str) -> Option<&LabelEncoder> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, encoder: LabelEncoder) {
        self.0.insert(name.into(), encoder);
    }

    /// Code for `value` under the encoder called `name`.
    pub fn transform(&self, name: &str, value: &str) -> Result<usize, EncodingError> {
        let encoder = self
            .get(name)
            .ok_or_else(|| EncodingError::MissingEncoder(name.to_string()))?;
        encoder.code(value).ok_or_else(|| EncodingError::UnknownCategory {
            encoder: name.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_position_in_file_order() {
        let enc = LabelEncoder::new(["Low", "Medium", "High"]);
        assert_eq!(enc.code("Low"), Some(0));
        assert_eq!(enc.code("High"), Some(2));
        assert_eq!(enc.code("low"), None);
    }

    #[test]
    fn every_label_round_trips() {
        let enc = LabelEncoder::new(["High", "Low", "Medium"]);
        for label in enc.classes() {
            let code = enc.code(label).unwrap();
            assert_eq!(enc.label(code), Some(label.as_str()));
        }
        assert_eq!(enc.label(3), None);
    }

    #[test]
    fn transform_rejects_unknown_values() {
        let encoders: CategoricalEncoders = serde_json::from_str(
            r#"{"Month": {"classes": ["January", "February"]}}"#,
        )
        .unwrap();
        assert_eq!(encoders.transform(MONTH, "February"), Ok(1));
        assert_eq!(
            encoders.transform(MONTH, "Smarch"),
            Err(EncodingError::UnknownCategory {
                encoder: "Month".into(),
                value: "Smarch".into(),
            })
        );
        assert_eq!(
            encoders.transform(LAST_WEEK_DEMAND, "Low"),
            Err(EncodingError::MissingEncoder("Last_Week_Demand".into()))
        );
    }

    #[test]
    fn detects_duplicate_labels() {
        assert!(LabelEncoder::new(["A", "B", "A"]).has_duplicates());
        assert!(!LabelEncoder::new(["A", "B"]).has_duplicates());
    }
}
