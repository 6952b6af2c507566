//! Training loop for the MLP estimator
//!
//! Full-batch Adam on z-scored inputs and outputs with an MSE loss. The fitted
//! burn module is exported into an [`MlpModel`] afterwards.

use burn::backend::{Autodiff, NdArray};
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};
use ndarray::ArrayView2;

use crate::model::mlp::{DenseLayer, MlpModel, MlpParams, Standardizer};
use crate::model::{Estimator, TrainedModel};
use crate::{GridironError, Result};

type TrainBackend = Autodiff<NdArray<f32>>;

/// Linear → ReLU blocks followed by a linear output layer
#[derive(Module, Debug)]
pub struct RegressionNet<B: Backend> {
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
}

impl<B: Backend> RegressionNet<B> {
    pub fn new(device: &B::Device, inputs: usize, hidden: &[usize], outputs: usize) -> Self {
        let mut layers = Vec::with_capacity(hidden.len());
        let mut width = inputs;
        for &h in hidden {
            layers.push(LinearConfig::new(width, h).init(device));
            width = h;
        }

        RegressionNet {
            hidden: layers,
            output: LinearConfig::new(width, outputs).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = x;
        for layer in &self.hidden {
            x = relu(layer.forward(x));
        }
        self.output.forward(x)
    }
}

fn standardized_tensor<B: Backend>(
    data: ArrayView2<f64>,
    norm: &Standardizer,
    device: &B::Device,
) -> Tensor<B, 2> {
    let values: Vec<f32> = data
        .rows()
        .into_iter()
        .flat_map(|row| norm.normalize(&row.to_vec()))
        .map(|v| v as f32)
        .collect();
    Tensor::from_data(TensorData::new(values, [data.nrows(), data.ncols()]), device)
}

fn export_layer<B: Backend>(layer: &Linear<B>) -> Result<DenseLayer> {
    let [inputs, outputs] = layer.weight.val().dims();
    let weights = layer
        .weight
        .val()
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| GridironError::Training(format!("weight export failed: {:?}", e)))?;
    let bias = match &layer.bias {
        Some(b) => b
            .val()
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| GridironError::Training(format!("bias export failed: {:?}", e)))?,
        None => vec![0.0; outputs],
    };

    Ok(DenseLayer {
        inputs,
        outputs,
        weights: weights.into_iter().map(f64::from).collect(),
        bias: bias.into_iter().map(f64::from).collect(),
    })
}

/// Fit a network and export its weights
pub fn train_mlp(params: &MlpParams, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<MlpModel> {
    if x.nrows() == 0 || x.nrows() != y.nrows() {
        return Err(GridironError::Training(format!(
            "mlp needs matching non-empty inputs, got {} feature rows and {} target rows",
            x.nrows(),
            y.nrows()
        )));
    }

    TrainBackend::seed(params.seed);
    let device = Default::default();

    let input_norm = Standardizer::fit(x);
    let output_norm = Standardizer::fit(y);
    let inputs = standardized_tensor::<TrainBackend>(x, &input_norm, &device);
    let targets = standardized_tensor::<TrainBackend>(y, &output_norm, &device);

    let mut model = RegressionNet::<TrainBackend>::new(&device, x.ncols(), &params.hidden, y.ncols());
    let mut optim = AdamConfig::new().init::<TrainBackend, RegressionNet<TrainBackend>>();

    for epoch in 0..params.epochs {
        let predictions = model.forward(inputs.clone());
        let loss = (predictions - targets.clone()).powf_scalar(2.0).mean();

        let loss_val: f32 = loss.clone().into_scalar().elem();
        if !loss_val.is_finite() {
            return Err(GridironError::Training(format!(
                "mlp loss diverged at epoch {}",
                epoch
            )));
        }
        if epoch % 100 == 0 || epoch + 1 == params.epochs {
            log::debug!("Epoch {:4} | MSE: {:.5}", epoch, loss_val);
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(params.learning_rate, model, grads);
    }

    let mut layers = model
        .hidden
        .iter()
        .map(export_layer)
        .collect::<Result<Vec<_>>>()?;
    layers.push(export_layer(&model.output)?);

    Ok(MlpModel {
        input_norm,
        output_norm,
        layers,
    })
}

impl Estimator for MlpParams {
    fn fit(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<TrainedModel> {
        train_mlp(self, x, y).map(TrainedModel::Mlp)
    }

    fn describe(&self) -> String {
        format!(
            "mlp(hidden {:?}, {} epochs, lr {})",
            self.hidden, self.epochs, self.learning_rate
        )
    }
}
