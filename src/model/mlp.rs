//! Feed-forward regression network
//!
//! Architecture: Input → [Linear → ReLU] × hidden → Linear(outputs)
//!
//! Training runs on burn (see `training::mlp_trainer`); the fitted weights
//! are exported into [`MlpModel`] so inference is plain arithmetic and the
//! artifact needs no backend to load.

use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Hyperparameters for the MLP estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpParams {
    /// Hidden layer widths (e.g., [32, 16] for two layers)
    pub hidden: Vec<usize>,
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for MlpParams {
    fn default() -> Self {
        MlpParams {
            hidden: vec![32, 16],
            epochs: 500,
            learning_rate: 1e-2,
            seed: 42,
        }
    }
}

/// Per-column z-score parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Standardizer {
    /// Compute from the columns of a matrix
    pub fn fit(data: ArrayView2<f64>) -> Self {
        let n = data.nrows().max(1) as f64;
        let mut mean = Vec::with_capacity(data.ncols());
        let mut std = Vec::with_capacity(data.ncols());

        for column in data.axis_iter(Axis(1)) {
            let m = column.sum() / n;
            let variance = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            mean.push(m);
            // Constant columns would otherwise divide by zero
            std.push(variance.sqrt().max(1e-3));
        }

        Standardizer { mean, std }
    }

    pub fn normalize(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn denormalize(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(v, (m, s))| v * s + m)
            .collect()
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }
}

/// Exported weights of one linear layer, row-major `[inputs][outputs]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

impl DenseLayer {
    pub fn forward(&self, input: &[f64]) -> Vec<f64> {
        (0..self.outputs)
            .map(|j| {
                let dot: f64 = (0..self.inputs)
                    .map(|i| input[i] * self.weights[i * self.outputs + j])
                    .sum();
                dot + self.bias.get(j).copied().unwrap_or(0.0)
            })
            .collect()
    }
}

/// A trained network ready for inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpModel {
    pub input_norm: Standardizer,
    pub output_norm: Standardizer,
    pub layers: Vec<DenseLayer>,
}

impl MlpModel {
    pub fn n_features(&self) -> usize {
        self.input_norm.width()
    }

    pub fn n_targets(&self) -> usize {
        self.output_norm.width()
    }

    /// Layer shapes must chain from the input width to the output width
    pub fn check_structure(&self) -> std::result::Result<(), String> {
        for (name, norm) in [("input", &self.input_norm), ("output", &self.output_norm)] {
            if norm.mean.len() != norm.std.len() {
                return Err(format!(
                    "{} standardizer has {} means and {} deviations",
                    name,
                    norm.mean.len(),
                    norm.std.len()
                ));
            }
        }
        if self.layers.is_empty() {
            return Err("network has no layers".to_string());
        }

        let mut width = self.n_features();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.inputs != width {
                return Err(format!(
                    "layer {} expects {} inputs but receives {}",
                    i, layer.inputs, width
                ));
            }
            if layer.weights.len() != layer.inputs * layer.outputs {
                return Err(format!(
                    "layer {} holds {} weights for a {}x{} shape",
                    i,
                    layer.weights.len(),
                    layer.inputs,
                    layer.outputs
                ));
            }
            if layer.bias.len() != layer.outputs {
                return Err(format!(
                    "layer {} holds {} biases for {} outputs",
                    i,
                    layer.bias.len(),
                    layer.outputs
                ));
            }
            width = layer.outputs;
        }

        if width != self.n_targets() {
            return Err(format!(
                "network produces {} outputs for {} targets",
                width,
                self.n_targets()
            ));
        }
        Ok(())
    }

    pub fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        let mut x = self.input_norm.normalize(row);
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(&x);
            if i < last {
                x.iter_mut().for_each(|v| *v = v.max(0.0));
            }
        }
        self.output_norm.denormalize(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_standardizer_round_trip() {
        let data = array![[1.0, 10.0], [3.0, 10.0]];
        let norm = Standardizer::fit(data.view());

        assert_relative_eq!(norm.mean[0], 2.0);
        assert_relative_eq!(norm.std[0], 1.0);
        // Constant column keeps a floor on its std
        assert_relative_eq!(norm.std[1], 1e-3);

        let z = norm.normalize(&[3.0, 10.0]);
        assert_relative_eq!(z[0], 1.0);
        assert_relative_eq!(z[1], 0.0);
        let back = norm.denormalize(&z);
        assert_relative_eq!(back[0], 3.0);
    }

    fn two_layer() -> MlpModel {
        let identity = Standardizer {
            mean: vec![0.0],
            std: vec![1.0],
        };
        MlpModel {
            input_norm: identity.clone(),
            output_norm: identity,
            layers: vec![
                DenseLayer {
                    inputs: 1,
                    outputs: 2,
                    weights: vec![1.0, -1.0],
                    bias: vec![0.0, 0.0],
                },
                DenseLayer {
                    inputs: 2,
                    outputs: 1,
                    weights: vec![1.0, 1.0],
                    bias: vec![0.5],
                },
            ],
        }
    }

    #[test]
    fn test_forward_applies_relu_between_layers() {
        let model = two_layer();

        // hidden = relu([2, -2]) = [2, 0]
        assert_relative_eq!(model.predict_row(&[2.0])[0], 2.5);
        // hidden = relu([-3, 3]) = [0, 3]
        assert_relative_eq!(model.predict_row(&[-3.0])[0], 3.5);
        assert_eq!(model.n_features(), 1);
        assert_eq!(model.n_targets(), 1);
        assert!(model.check_structure().is_ok());
    }

    #[test]
    fn test_structure_check_rejects_broken_chain() {
        let mut wide_input = two_layer();
        wide_input.layers[0].inputs = 3;
        assert!(wide_input.check_structure().is_err());

        let mut short_weights = two_layer();
        short_weights.layers[1].weights.pop();
        assert!(short_weights.check_structure().is_err());

        let mut short_bias = two_layer();
        short_bias.layers[0].bias.pop();
        assert!(short_bias.check_structure().is_err());

        let mut extra_output = two_layer();
        extra_output.layers[1].outputs = 2;
        extra_output.layers[1].weights = vec![1.0; 4];
        extra_output.layers[1].bias = vec![0.0; 2];
        assert!(extra_output.check_structure().is_err());

        let mut no_layers = two_layer();
        no_layers.layers.clear();
        assert!(no_layers.check_structure().is_err());
    }
}
