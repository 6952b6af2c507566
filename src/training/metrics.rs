//! Hold-out evaluation metrics

use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-target mean absolute error on a hold-out split
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldoutMetrics {
    /// Rows in the hold-out split
    pub rows: usize,
    /// Target name -> MAE, in schema target order
    pub mae: Vec<(String, f64)>,
}

impl HoldoutMetrics {
    /// Compare predictions with actual values column by column
    pub fn evaluate(
        target_names: &[String],
        predicted: ArrayView2<f64>,
        actual: ArrayView2<f64>,
    ) -> Self {
        let rows = actual.nrows();
        let mae = target_names
            .iter()
            .zip(
                predicted
                    .axis_iter(Axis(1))
                    .zip(actual.axis_iter(Axis(1))),
            )
            .map(|(name, (p, a))| {
                let total: f64 = p.iter().zip(a.iter()).map(|(p, a)| (p - a).abs()).sum();
                let mae = if rows == 0 { 0.0 } else { total / rows as f64 };
                (name.clone(), mae)
            })
            .collect();

        HoldoutMetrics { rows, mae }
    }

    /// Mean of the per-target errors
    pub fn mean_mae(&self) -> f64 {
        if self.mae.is_empty() {
            0.0
        } else {
            self.mae.iter().map(|(_, v)| v).sum::<f64>() / self.mae.len() as f64
        }
    }

    pub fn get(&self, target: &str) -> Option<f64> {
        self.mae.iter().find(|(n, _)| n == target).map(|(_, v)| *v)
    }
}

impl fmt::Display for HoldoutMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hold-out ({} rows) | Mean MAE: {:.3}", self.rows, self.mean_mae())?;
        for (name, mae) in &self.mae {
            write!(f, " | {}: {:.3}", name, mae)?;
        }
        Ok(())
    }
}
