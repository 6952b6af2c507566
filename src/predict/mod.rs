//! Prediction and inference
//!
//! Load trained cohort artifacts and answer player/matchup queries.

pub mod inference;

pub use inference::{format_prediction, Prediction, PredictionQuery, PredictionValue, Predictor};
