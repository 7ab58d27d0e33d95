//! Random forest classifier in its exported JSON form.
//!
//! Each tree is a flat node list in pre-order. A split node sends the sample
//! left when `x[feature] <= threshold`. A leaf carries per-class weights
//! (training sample counts or fractions); they are normalised per tree and the
//! forest probability is the mean of the tree probabilities.

use serde::Deserialize;

use crate::error::PredictionError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Forest {
    pub n_features: usize,
    /// Class values in probability-column order (encoded target codes).
    pub classes: Vec<usize>,
    pub trees: Vec<Tree>,
}

impl Tree {
    fn leaf(&self, x: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { value } => return value,
            }
        }
    }
}

impl Forest {
    /// Structural checks run once at load time so that scoring can index
    /// without bounds failures and tree walks always terminate.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("forest has no classes".into());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split {
                        feature, left, right, ..
                    } => {
                        if *feature >= self.n_features {
                            return Err(format!("tree {t} node {i}: feature {feature} out of range"));
                        }
                        // pre-order layout: children always come after their parent
                        for child in [left, right] {
                            if *child <= i || *child >= tree.nodes.len() {
                                return Err(format!("tree {t} node {i}: bad child index {child}"));
                            }
                        }
                    }
                    Node::Leaf { value } => {
                        if value.len() != self.classes.len() {
                            return Err(format!(
                                "tree {t} node {i}: {} leaf weights for {} classes",
                                value.len(),
                                self.classes.len()
                            ));
                        }
                        if value.iter().any(|v| !v.is_finite() || *v < 0.0) || value.iter().sum::<f64>() <= 0.0 {
                            return Err(format!("tree {t} node {i}: invalid leaf weights"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Mean per-class probability over all trees.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if x.len() != self.n_features {
            return Err(PredictionError::Classifier(format!(
                "feature length mismatch: got {}, expected {}",
                x.len(),
                self.n_features
            )));
        }

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf(x);
            let total: f64 = leaf.iter().sum();
            for (p, w) in proba.iter_mut().zip(leaf) {
                *p += w / total;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }

    /// Winning class value and its probability. Ties go to the lowest column.
    pub fn predict(&self, x: &[f64]) -> Result<(usize, f64), PredictionError> {
        let proba = self.predict_proba(x)?;
        let (col, p) = proba
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &p)| if p > best.1 { (i, p) } else { best });
        Ok((self.classes[col], p))
    }
}
