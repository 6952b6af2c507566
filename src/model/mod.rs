//! Regression models
//!
//! Two estimators share one interface:
//! - Forest: bagged regression trees, one forest per output
//! - MLP: small feed-forward network trained with burn
//!
//! Both fit on `(rows, features)` / `(rows, targets)` matrices and produce a
//! [`TrainedModel`] that serializes into the model artifact.

pub mod artifact;
pub mod forest;
pub mod mlp;

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::Result;

pub use artifact::ModelArtifact;
pub use forest::{ForestModel, ForestParams};
pub use mlp::{MlpModel, MlpParams};

/// A configured learning algorithm
pub trait Estimator {
    /// Fit on a feature matrix and a target matrix with one column per output
    fn fit(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<TrainedModel>;

    /// Short human-readable description stored with the artifact
    fn describe(&self) -> String;
}

/// A fitted model of either kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrainedModel {
    Forest(ForestModel),
    Mlp(MlpModel),
}

impl TrainedModel {
    pub fn n_features(&self) -> usize {
        match self {
            TrainedModel::Forest(m) => m.n_features(),
            TrainedModel::Mlp(m) => m.n_features(),
        }
    }

    pub fn n_targets(&self) -> usize {
        match self {
            TrainedModel::Forest(m) => m.n_targets(),
            TrainedModel::Mlp(m) => m.n_targets(),
        }
    }

    /// Predict every output for one feature vector
    pub fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        match self {
            TrainedModel::Forest(m) => m.predict_row(row),
            TrainedModel::Mlp(m) => m.predict_row(row),
        }
    }

    /// Predict every row of a feature matrix
    pub fn predict(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let n_targets = self.n_targets();
        let mut out = Array2::zeros((x.nrows(), n_targets));
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            let values = self.predict_row(&row.to_vec());
            for (j, v) in values.into_iter().enumerate().take(n_targets) {
                out[[i, j]] = v;
            }
        }
        out
    }

    /// Internal shape checks beyond the declared widths
    pub fn check_structure(&self) -> std::result::Result<(), String> {
        match self {
            TrainedModel::Forest(m) => m.check_structure(),
            TrainedModel::Mlp(m) => m.check_structure(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrainedModel::Forest(_) => "forest",
            TrainedModel::Mlp(_) => "mlp",
        }
    }
}
