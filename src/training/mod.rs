//! Model training
//!
//! Training matrices, estimator fitting and hold-out evaluation.

pub mod dataset;
pub mod metrics;
pub mod mlp_trainer;
pub mod trainer;

pub use dataset::TrainingSet;
pub use metrics::HoldoutMetrics;
pub use trainer::ModelTrainer;
